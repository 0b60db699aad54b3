//! Marker resolution: which properties of a class are generation targets, and
//! with what configuration.
//!
//! Two selection modes exist and never mix:
//!
//! - **Opt-out**: the class carries the inclusion marker, so every property is
//!   selected except those carrying the exclusion marker.
//! - **Opt-in**: otherwise only properties carrying the inclusion marker are
//!   selected.
//!
//! Exclusion always wins, including when a property carries both markers.
//!
//! Configuration for a selected property resolves, first hit wins:
//!
//! | level | naming convention                   | compare method (class-wide)         |
//! |-------|-------------------------------------|-------------------------------------|
//! | 1     | property marker argument            | class marker argument               |
//! | 2     | class marker argument               | class marker type capability        |
//! | 3     | marker type capability              | first selected property's marker type capability (opt-in) |
//! | 4     | [`GeneratorSettings`] default       | [`GeneratorSettings`] default       |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{CompareMethod, GenerationConfig, NamingConvention};
use crate::conventions::{
    ATTRIBUTE_SUFFIX, COMPARE_ARGUMENT, COMPARE_ENUM, NAMING_ARGUMENT, NAMING_ENUM,
};
use crate::settings::GeneratorSettings;
use crate::syntax::{ArgumentValue, ClassDecl, MarkerUsage, MemberId, PropertyDecl, Visibility};

/// Identity of a marker's declared type (`NotifyAttribute`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerType(pub String);

impl MarkerType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Symbol-resolution service supplied by the host.
pub trait SymbolResolver {
    /// Maps a marker usage to the type it instantiates, if known.
    fn resolve_marker(&self, usage: &MarkerUsage) -> Option<MarkerType>;

    /// Interfaces the marker type implements (short or qualified names).
    fn implemented_interfaces(&self, marker: &MarkerType) -> Vec<String>;
}

/// Resolves marker usages purely by name.
///
/// `Notify`, `NotifyAttribute`, `Annotations.Notify` and
/// `global::Annotations.NotifyAttribute` all resolve to `NotifyAttribute`.
/// Interfaces are only known for marker types registered with
/// [`NameResolver::with_interfaces`].
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    interfaces: HashMap<MarkerType, Vec<String>>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the interfaces implemented by a marker type.
    pub fn with_interfaces<I, S>(mut self, marker: &str, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(marker, interfaces);
        self
    }

    pub fn register<I, S>(&mut self, marker: &str, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces
            .entry(Self::marker_type(marker))
            .or_default()
            .extend(interfaces.into_iter().map(Into::into));
    }

    /// Normalises a written marker name to its type identity.
    pub fn marker_type(name: &str) -> MarkerType {
        let name = name.trim().trim_start_matches("global::");
        let short = name.rsplit('.').next().unwrap_or(name);

        if short.ends_with(ATTRIBUTE_SUFFIX) {
            MarkerType::new(short)
        } else {
            MarkerType::new(format!("{short}{ATTRIBUTE_SUFFIX}"))
        }
    }
}

impl SymbolResolver for NameResolver {
    fn resolve_marker(&self, usage: &MarkerUsage) -> Option<MarkerType> {
        if usage.name.trim().is_empty() {
            return None;
        }
        Some(Self::marker_type(&usage.name))
    }

    fn implemented_interfaces(&self, marker: &MarkerType) -> Vec<String> {
        self.interfaces.get(marker).cloned().unwrap_or_default()
    }
}

/// A capability tag a marker type may implement to change a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Naming(NamingConvention),
    Compare(CompareMethod),
}

impl Capability {
    /// Maps an interface name to its capability, ignoring any namespace.
    pub fn from_interface(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches("global::");
        let short = name.rsplit('.').next().unwrap_or(name);

        match short {
            "IPlainNamingConvention" => Some(Self::Naming(NamingConvention::Plain)),
            "ILeadingUnderscoreNamingConvention" => {
                Some(Self::Naming(NamingConvention::LeadingUnderscore))
            }
            "ITrailingUnderscoreNamingConvention" => {
                Some(Self::Naming(NamingConvention::TrailingUnderscore))
            }
            "INoneCompareMethod" => Some(Self::Compare(CompareMethod::None)),
            "IReferenceEqualsCompareMethod" => Some(Self::Compare(CompareMethod::ReferenceEquals)),
            "IEqualityComparerCompareMethod" => {
                Some(Self::Compare(CompareMethod::EqualityComparer))
            }
            _ => None,
        }
    }
}

/// Defaults a marker type declares through its capability tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerDefaults {
    pub naming_convention: Option<NamingConvention>,
    pub compare_method: Option<CompareMethod>,
}

/// Per-resolution cache from marker type to its declared defaults.
#[derive(Debug, Default)]
struct CapabilityTable {
    entries: HashMap<MarkerType, MarkerDefaults>,
}

impl CapabilityTable {
    fn lookup<R: SymbolResolver + ?Sized>(
        &mut self,
        symbols: &R,
        marker: &MarkerType,
    ) -> MarkerDefaults {
        if let Some(defaults) = self.entries.get(marker) {
            return *defaults;
        }

        let mut defaults = MarkerDefaults::default();
        for interface in symbols.implemented_interfaces(marker) {
            match Capability::from_interface(&interface) {
                Some(Capability::Naming(convention)) => {
                    defaults.naming_convention.get_or_insert(convention);
                }
                Some(Capability::Compare(method)) => {
                    defaults.compare_method.get_or_insert(method);
                }
                None => {}
            }
        }

        self.entries.insert(marker.clone(), defaults);
        defaults
    }
}

/// Explicit configuration carried by one inclusion marker usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerArguments {
    pub naming_convention: Option<NamingConvention>,
    pub compare_method: Option<CompareMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Naming,
    Compare,
}

impl MarkerArguments {
    /// Parses the configuration arguments of an inclusion marker.
    ///
    /// Named arguments route by parameter name, qualified enumerants by their
    /// enum type, and everything else by position (naming first). Absent,
    /// empty and unrecognised values leave the slot unset.
    pub fn parse(usage: &MarkerUsage) -> Self {
        let mut parsed = Self::default();
        let mut position = 0;

        for argument in &usage.arguments {
            let slot = match (&argument.name, &argument.value) {
                (Some(name), _) if name == NAMING_ARGUMENT => Some(Slot::Naming),
                (Some(name), _) if name == COMPARE_ARGUMENT => Some(Slot::Compare),
                (Some(name), _) => {
                    tracing::debug!(
                        marker = %usage.name,
                        argument = %name,
                        "ignoring unknown marker argument"
                    );
                    None
                }
                (None, value) => {
                    let by_position = match position {
                        0 => Some(Slot::Naming),
                        1 => Some(Slot::Compare),
                        _ => None,
                    };
                    position += 1;
                    enumerant_slot(value).or(by_position)
                }
            };

            match slot {
                Some(Slot::Naming) => {
                    if let Some(convention) =
                        parse_token(usage, &argument.value, NamingConvention::from_token)
                    {
                        parsed.naming_convention = Some(convention);
                    }
                }
                Some(Slot::Compare) => {
                    if let Some(method) =
                        parse_token(usage, &argument.value, CompareMethod::from_token)
                    {
                        parsed.compare_method = Some(method);
                    }
                }
                None => {}
            }
        }

        parsed
    }
}

fn enumerant_slot(value: &ArgumentValue) -> Option<Slot> {
    let ArgumentValue::Enumerant {
        qualifier: Some(qualifier),
        ..
    } = value
    else {
        return None;
    };

    let enum_name = qualifier.rsplit('.').next().unwrap_or(qualifier);
    match enum_name {
        NAMING_ENUM => Some(Slot::Naming),
        COMPARE_ENUM => Some(Slot::Compare),
        _ => None,
    }
}

fn parse_token<T>(
    usage: &MarkerUsage,
    value: &ArgumentValue,
    from_token: fn(&str) -> Option<T>,
) -> Option<T> {
    let token = match value {
        ArgumentValue::Absent => return None,
        ArgumentValue::Text(text) if text.trim().is_empty() => return None,
        ArgumentValue::Text(text) => text.as_str(),
        ArgumentValue::Enumerant { name, .. } => name.as_str(),
        ArgumentValue::Expression(expression) => expression.as_str(),
    };

    let parsed = from_token(token);
    if parsed.is_none() {
        tracing::warn!(
            marker = %usage.name,
            token,
            "unrecognised configuration token, keeping default"
        );
    }
    parsed
}

/// One property under consideration, as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMarker {
    pub member: MemberId,
    pub property_name: String,
    pub declared_type: String,
    pub has_explicit_include: bool,
    pub has_explicit_exclude: bool,
    /// Explicit `get` accessor visibility.
    pub getter_visibility: Option<Visibility>,
    /// Explicit `set` accessor visibility.
    pub setter_visibility: Option<Visibility>,
    pub has_setter: bool,
}

impl PropertyMarker {
    fn new(member: MemberId, property: &PropertyDecl, include: bool, exclude: bool) -> Self {
        Self {
            member,
            property_name: property.name.clone(),
            declared_type: property.type_name.clone(),
            has_explicit_include: include,
            has_explicit_exclude: exclude,
            getter_visibility: property.getter().and_then(|accessor| accessor.visibility),
            setter_visibility: property.setter().and_then(|accessor| accessor.visibility),
            has_setter: property.setter().is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Only explicitly marked properties are selected.
    OptIn,
    /// The class is marked; every property not excluded is selected.
    OptOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProperty {
    pub marker: PropertyMarker,
    pub config: GenerationConfig,
}

/// Resolver output for a generation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub mode: SelectionMode,
    /// Selected properties in declaration order.
    pub selected: Vec<SelectedProperty>,
    /// The class-wide compare method.
    pub compare_method: CompareMethod,
}

impl Resolution {
    pub fn is_selected(&self, member: MemberId) -> bool {
        self.selected
            .iter()
            .any(|selected| selected.marker.member == member)
    }

    pub fn get(&self, member: MemberId) -> Option<&SelectedProperty> {
        self.selected
            .iter()
            .find(|selected| selected.marker.member == member)
    }
}

/// Determines the selected properties of a class and their configuration.
pub struct MarkerResolver<'a, R: SymbolResolver + ?Sized> {
    settings: &'a GeneratorSettings,
    symbols: &'a R,
}

impl<'a, R: SymbolResolver + ?Sized> MarkerResolver<'a, R> {
    pub fn new(settings: &'a GeneratorSettings, symbols: &'a R) -> Self {
        Self { settings, symbols }
    }

    /// Resolves a class.
    ///
    /// ## Returns
    /// `None` when the class has no selected property ("not a generation
    /// target"), otherwise the selected properties with their configuration.
    pub fn resolve(&self, class: &ClassDecl) -> Option<Resolution> {
        let include = MarkerType::new(self.settings.markers.include_type());
        let exclude = MarkerType::new(self.settings.markers.exclude_type());
        let defaults = self.settings.generation_defaults();
        let mut capabilities = CapabilityTable::default();

        let class_marker = self.find_marker(&class.markers, &include);
        let mode = if class_marker.is_some() {
            SelectionMode::OptOut
        } else {
            SelectionMode::OptIn
        };

        let class_arguments = class_marker.map(MarkerArguments::parse).unwrap_or_default();
        let class_defaults = class_marker
            .and_then(|usage| self.symbols.resolve_marker(usage))
            .map(|marker| capabilities.lookup(self.symbols, &marker))
            .unwrap_or_default();

        let mut candidates = Vec::new();
        for (member, property) in class.properties() {
            let property_marker = self.find_marker(&property.markers, &include);
            let excluded = self.find_marker(&property.markers, &exclude).is_some();

            let selected = match mode {
                SelectionMode::OptOut => !excluded,
                SelectionMode::OptIn => property_marker.is_some() && !excluded,
            };
            if !selected {
                tracing::trace!(
                    class = %class.name,
                    property = %property.name,
                    excluded,
                    "property not selected"
                );
                continue;
            }

            let marker_defaults = property_marker
                .and_then(|usage| self.symbols.resolve_marker(usage))
                .map(|marker| capabilities.lookup(self.symbols, &marker))
                .unwrap_or_default();
            let arguments = property_marker
                .map(MarkerArguments::parse)
                .unwrap_or_default();

            candidates.push((
                PropertyMarker::new(member.id, property, property_marker.is_some(), excluded),
                arguments,
                marker_defaults,
            ));
        }

        if candidates.is_empty() {
            tracing::debug!(class = %class.name, "no selected properties, not a generation target");
            return None;
        }

        let compare_method = class_arguments
            .compare_method
            .or(class_defaults.compare_method)
            .or_else(|| match mode {
                SelectionMode::OptIn => candidates
                    .first()
                    .and_then(|(_, _, marker_defaults)| marker_defaults.compare_method),
                SelectionMode::OptOut => None,
            })
            .unwrap_or(defaults.compare_method);

        let selected = candidates
            .into_iter()
            .map(|(marker, arguments, marker_defaults)| {
                let naming_convention = arguments
                    .naming_convention
                    .or(class_arguments.naming_convention)
                    .or(marker_defaults.naming_convention)
                    .or(class_defaults.naming_convention)
                    .unwrap_or(defaults.naming_convention);

                SelectedProperty {
                    marker,
                    config: GenerationConfig {
                        naming_convention,
                        compare_method,
                    },
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            class = %class.name,
            ?mode,
            selected = selected.len(),
            %compare_method,
            "resolved generation targets"
        );

        Some(Resolution {
            mode,
            selected,
            compare_method,
        })
    }

    fn find_marker<'m>(
        &self,
        markers: &'m [MarkerUsage],
        wanted: &MarkerType,
    ) -> Option<&'m MarkerUsage> {
        markers
            .iter()
            .find(|usage| self.symbols.resolve_marker(usage).as_ref() == Some(wanted))
    }
}
