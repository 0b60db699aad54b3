//! The per-class pipeline: resolve markers, detect staleness, build a plan.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::conventions::{DIAGNOSTIC_ID, DIAGNOSTIC_MESSAGE, DIAGNOSTIC_TITLE};
use crate::emit;
use crate::marker::{MarkerResolver, Resolution, SymbolResolver};
use crate::plan::{self, EditPlan};
use crate::region;
use crate::settings::GeneratorSettings;
use crate::staleness::{self, StaleReason, Staleness};
use crate::syntax::{ClassDecl, CodeRange};

/// Outcome of analysing one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis {
    /// The class has no selected property.
    NotATarget,
    /// The generated region matches the selected properties.
    UpToDate { resolution: Resolution },
    /// The class needs regeneration; applying `plan` brings it up to date.
    Regenerate {
        resolution: Resolution,
        plan: EditPlan,
    },
}

impl Analysis {
    pub fn is_target(&self) -> bool {
        !matches!(self, Self::NotATarget)
    }

    pub fn plan(&self) -> Option<&EditPlan> {
        match self {
            Self::Regenerate { plan, .. } => Some(plan),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&StaleReason> {
        self.plan().map(|plan| &plan.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// The persistent "needs regeneration" signal for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub class_name: String,
    /// Location of the class declaration, when the host supplied one.
    pub range: Option<CodeRange>,
    pub reason: StaleReason,
}

impl Diagnostic {
    /// Builds the diagnostic for a class whose analysis asks for regeneration.
    pub fn for_analysis(class: &ClassDecl, analysis: &Analysis) -> Option<Self> {
        let reason = analysis.reason()?;
        Some(Self {
            id: DIAGNOSTIC_ID.to_string(),
            title: DIAGNOSTIC_TITLE.to_string(),
            message: DIAGNOSTIC_MESSAGE.to_string(),
            severity: Severity::Error,
            class_name: class.name.clone(),
            range: class.range,
            reason: reason.clone(),
        })
    }
}

/// Runs the analysis pipeline with a fixed set of settings.
///
/// Every call is independent: nothing is cached between classes, so a host
/// may analyse classes concurrently through a shared `&Generator`.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Analyses one class.
    ///
    /// ## Returns
    /// - [`Analysis::NotATarget`] when no property is selected
    /// - [`Analysis::UpToDate`] when the generated code matches
    /// - [`Analysis::Regenerate`] with the edit plan otherwise
    #[instrument(
        name = "analyze",
        skip_all,
        fields(class = %class.name, members = class.members.len())
    )]
    pub fn analyze<R: SymbolResolver + ?Sized>(&self, class: &ClassDecl, symbols: &R) -> Analysis {
        let Some(resolution) = MarkerResolver::new(&self.settings, symbols).resolve(class) else {
            return Analysis::NotATarget;
        };

        let region = region::locate(class);
        match staleness::detect_in(class, region.as_ref(), &resolution) {
            Staleness::UpToDate => {
                debug!("generated code is up to date");
                Analysis::UpToDate { resolution }
            }
            Staleness::Stale(reason) => {
                debug!(%reason, "generated code is stale");
                let plan = plan::build_with_region(class, region.as_ref(), &resolution, reason);
                Analysis::Regenerate { resolution, plan }
            }
        }
    }

    /// Analyses a class and, when stale, returns the regenerated model.
    pub fn regenerate<R: SymbolResolver + ?Sized>(
        &self,
        class: &ClassDecl,
        symbols: &R,
    ) -> Option<ClassDecl> {
        self.analyze(class, symbols)
            .plan()
            .map(|plan| emit::emit(class, plan))
    }
}
