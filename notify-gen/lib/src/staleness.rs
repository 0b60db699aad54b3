//! Staleness detection for previously generated code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::marker::Resolution;
use crate::region::{self, GeneratedRegion};
use crate::syntax::ClassDecl;

/// Why a class needs regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaleReason {
    /// The class does not declare `INotifyPropertyChanged`.
    MissingInterface,
    /// No generated region exists.
    MissingRegion,
    /// The generated region has no setter helper.
    MissingSetterHelper,
    /// No field in the generated region backs this selected property.
    MissingBackingField { property: String },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInterface => write!(f, "class does not implement INotifyPropertyChanged"),
            Self::MissingRegion => write!(f, "generated region is missing"),
            Self::MissingSetterHelper => write!(f, "setter helper is missing"),
            Self::MissingBackingField { property } => {
                write!(f, "no backing field for `{property}`")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Staleness {
    UpToDate,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Decides whether the generated code of `class` matches `resolution`.
///
/// A class is up to date only when it declares the change-notification
/// interface, has a generated region, the region holds the setter helper, and
/// every selected property has a plausibly matching field in the region. The
/// first violated condition, in that order, is reported.
pub fn detect(class: &ClassDecl, resolution: &Resolution) -> Staleness {
    detect_in(class, region::locate(class).as_ref(), resolution)
}

/// Same as [`detect`] with an already located region.
pub fn detect_in(
    class: &ClassDecl,
    region: Option<&GeneratedRegion>,
    resolution: &Resolution,
) -> Staleness {
    if !class.declares_change_notification() {
        return Staleness::Stale(StaleReason::MissingInterface);
    }

    let Some(region) = region else {
        return Staleness::Stale(StaleReason::MissingRegion);
    };

    if !region.contains_setter_helper {
        return Staleness::Stale(StaleReason::MissingSetterHelper);
    }

    let missing = resolution
        .selected
        .iter()
        .find(|selected| !region.backs(&selected.marker.property_name));
    if let Some(selected) = missing {
        return Staleness::Stale(StaleReason::MissingBackingField {
            property: selected.marker.property_name.clone(),
        });
    }

    Staleness::UpToDate
}
