//! Host-neutral model of a class declaration.
//!
//! A host (see [`crate::csharp`]) lowers its own syntax tree into these types;
//! the analysis core only ever reads them. Members keep declaration order and
//! `#region` / `#endregion` directives appear in the member list as
//! [`MemberKind::Region`] tags at the position they occupy in the source.

use serde::{Deserialize, Serialize};

use crate::conventions;

/// A source code range with line/column and byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Identity of a member within its class (its declaration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub usize);

/// Declared accessibility of a member or accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    ProtectedInternal,
    Private,
    PrivateProtected,
}

impl Visibility {
    /// Returns the keyword(s) spelling this visibility.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Protected => "protected",
            Self::ProtectedInternal => "protected internal",
            Self::Private => "private",
            Self::PrivateProtected => "private protected",
        }
    }

    /// Derives the visibility spelled by a modifier list, if any.
    pub fn from_modifiers<S: AsRef<str>>(modifiers: &[S]) -> Option<Self> {
        let has = |keyword: &str| modifiers.iter().any(|modifier| modifier.as_ref() == keyword);

        match (has("public"), has("protected"), has("internal"), has("private")) {
            (true, ..) => Some(Self::Public),
            (_, true, true, _) => Some(Self::ProtectedInternal),
            (_, true, _, true) => Some(Self::PrivateProtected),
            (_, true, _, _) => Some(Self::Protected),
            (_, _, true, _) => Some(Self::Internal),
            (_, _, _, true) => Some(Self::Private),
            _ => None,
        }
    }
}

/// Value of one marker argument.
///
/// Free-form strings and strongly-typed enumerants are separate variants and
/// are parsed independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// A string literal, unquoted (`"LeadingUnderscore"` → `LeadingUnderscore`).
    Text(String),
    /// An enumerant reference (`NamingConvention.LeadingUnderscore`).
    Enumerant {
        qualifier: Option<String>,
        name: String,
    },
    /// `null` or `default`.
    Absent,
    /// Any other expression, verbatim.
    Expression(String),
}

impl ArgumentValue {
    /// Classifies an argument expression by its source text.
    pub fn from_source(text: &str) -> Self {
        let text = text.trim();

        if text == "null" || text == "default" || text.starts_with("default(") {
            return Self::Absent;
        }

        if let Some(unquoted) = unquote(text) {
            return Self::Text(unquoted.to_string());
        }

        let is_path = !text.is_empty()
            && text.split('.').all(|segment| {
                let mut chars = segment.chars();
                matches!(chars.next(), Some(first) if first.is_alphabetic() || first == '_')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            });

        if is_path {
            let text = text.trim_start_matches("global::");
            return match text.rsplit_once('.') {
                Some((qualifier, name)) => Self::Enumerant {
                    qualifier: Some(qualifier.to_string()),
                    name: name.to_string(),
                },
                None => Self::Enumerant {
                    qualifier: None,
                    name: text.to_string(),
                },
            };
        }

        Self::Expression(text.to_string())
    }
}

fn unquote(text: &str) -> Option<&str> {
    let body = text.strip_prefix('@').unwrap_or(text);
    let body = body.strip_prefix('"')?.strip_suffix('"')?;
    // Raw string literals ("""...""") keep their extra quotes until here.
    Some(body.trim_matches('"'))
}

/// One argument of a marker usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerArgument {
    /// Parameter name for `name: value` arguments.
    pub name: Option<String>,
    pub value: ArgumentValue,
}

impl MarkerArgument {
    pub fn positional(value: ArgumentValue) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: ArgumentValue) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// A declarative marker attached to a class or property (`[Notify(...)]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerUsage {
    /// The marker name as written (`Notify`, `NotifyAttribute`, `Annotations.Notify`).
    pub name: String,
    pub arguments: Vec<MarkerArgument>,
    pub range: Option<CodeRange>,
}

impl MarkerUsage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            range: None,
        }
    }

    pub fn with_argument(mut self, argument: MarkerArgument) -> Self {
        self.arguments.push(argument);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessorKind {
    Get,
    Set,
    Init,
}

/// A property accessor (`get;`, `private set { ... }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    pub kind: AccessorKind,
    /// Accessor-level visibility; `None` inherits the property's.
    pub visibility: Option<Visibility>,
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub markers: Vec<MarkerUsage>,
    pub accessors: Vec<Accessor>,
    /// Auto-property initializer expression (`= 5;` → `5`).
    pub initializer: Option<String>,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: vec!["public".to_string()],
            markers: Vec::new(),
            accessors: vec![
                Accessor {
                    kind: AccessorKind::Get,
                    visibility: None,
                    has_body: false,
                },
                Accessor {
                    kind: AccessorKind::Set,
                    visibility: None,
                    has_body: false,
                },
            ],
            initializer: None,
        }
    }

    pub fn getter(&self) -> Option<&Accessor> {
        self.accessors
            .iter()
            .find(|accessor| accessor.kind == AccessorKind::Get)
    }

    /// The `set` accessor. `init` accessors are not setters.
    pub fn setter(&self) -> Option<&Accessor> {
        self.accessors
            .iter()
            .find(|accessor| accessor.kind == AccessorKind::Set)
    }

    pub fn visibility(&self) -> Option<Visibility> {
        Visibility::from_modifiers(&self.modifiers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub type_name: String,
    pub names: Vec<String>,
    pub modifiers: Vec<String>,
    /// Initializer of the first declarator.
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFieldDecl {
    pub type_name: String,
    pub names: Vec<String>,
}

impl EventFieldDecl {
    /// True for exactly `PropertyChangedEventHandler PropertyChanged`.
    pub fn is_change_notification_event(&self) -> bool {
        conventions::is_event_handler_type(&self.type_name)
            && self.names.len() == 1
            && self.names[0] == conventions::EVENT_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
}

/// A `#region name` or `#endregion` directive between members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionTag {
    Start { name: String },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    Property(PropertyDecl),
    Field(FieldDecl),
    EventField(EventFieldDecl),
    Method(MethodDecl),
    Region(RegionTag),
    /// Constructors, indexers, nested types and anything else never touched.
    Other { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub kind: MemberKind,
    pub range: Option<CodeRange>,
}

impl Member {
    pub fn as_property(&self) -> Option<&PropertyDecl> {
        match &self.kind {
            MemberKind::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn region_tag(&self) -> Option<&RegionTag> {
        match &self.kind {
            MemberKind::Region(tag) => Some(tag),
            _ => None,
        }
    }
}

/// A class declaration: its markers, declared base types and ordered members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub markers: Vec<MarkerUsage>,
    pub base_types: Vec<String>,
    pub members: Vec<Member>,
    pub range: Option<CodeRange>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            base_types: Vec::new(),
            members: Vec::new(),
            range: None,
        }
    }

    /// Appends a member and returns its id.
    pub fn push(&mut self, kind: MemberKind, range: Option<CodeRange>) -> MemberId {
        let id = MemberId(self.members.len());
        self.members.push(Member { id, kind, range });
        id
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Property members in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&Member, &PropertyDecl)> {
        self.members
            .iter()
            .filter_map(|member| member.as_property().map(|property| (member, property)))
    }

    /// True when the class declares the change-notification capability.
    pub fn declares_change_notification(&self) -> bool {
        self.base_types
            .iter()
            .any(|base| conventions::is_change_notification_interface(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_from_modifier_combinations() {
        assert_eq!(
            Visibility::from_modifiers(&["public", "virtual"]),
            Some(Visibility::Public)
        );
        assert_eq!(
            Visibility::from_modifiers(&["protected", "internal"]),
            Some(Visibility::ProtectedInternal)
        );
        assert_eq!(
            Visibility::from_modifiers(&["private", "protected"]),
            Some(Visibility::PrivateProtected)
        );
        assert_eq!(Visibility::from_modifiers(&["static"]), None);
        assert_eq!(Visibility::from_modifiers::<&str>(&[]), None);
    }

    #[test]
    fn argument_values_are_classified_by_shape() {
        assert_eq!(
            ArgumentValue::from_source("\"LeadingUnderscore\""),
            ArgumentValue::Text("LeadingUnderscore".to_string())
        );
        assert_eq!(
            ArgumentValue::from_source("@\"None\""),
            ArgumentValue::Text("None".to_string())
        );
        assert_eq!(
            ArgumentValue::from_source("\"\""),
            ArgumentValue::Text(String::new())
        );
        assert_eq!(
            ArgumentValue::from_source("NamingConvention.TrailingUnderscore"),
            ArgumentValue::Enumerant {
                qualifier: Some("NamingConvention".to_string()),
                name: "TrailingUnderscore".to_string(),
            }
        );
        assert_eq!(
            ArgumentValue::from_source("ReferenceEquals"),
            ArgumentValue::Enumerant {
                qualifier: None,
                name: "ReferenceEquals".to_string(),
            }
        );
        assert_eq!(ArgumentValue::from_source("null"), ArgumentValue::Absent);
        assert_eq!(
            ArgumentValue::from_source("default(CompareMethod)"),
            ArgumentValue::Absent
        );
        assert_eq!(
            ArgumentValue::from_source("(NamingConvention)1"),
            ArgumentValue::Expression("(NamingConvention)1".to_string())
        );
    }

    #[test]
    fn change_notification_event_requires_exact_declaration() {
        let event = EventFieldDecl {
            type_name: "PropertyChangedEventHandler".to_string(),
            names: vec!["PropertyChanged".to_string()],
        };
        assert!(event.is_change_notification_event());

        let other = EventFieldDecl {
            type_name: "EventHandler".to_string(),
            names: vec!["PropertyChanged".to_string()],
        };
        assert!(!other.is_change_notification_event());
    }

    #[test]
    fn push_assigns_sequential_ids() {
        let mut class = ClassDecl::new("MyClass");
        let first = class.push(
            MemberKind::Property(PropertyDecl::new("A", "int")),
            None,
        );
        let second = class.push(MemberKind::Method(MethodDecl { name: "M".into() }), None);

        assert_eq!(first, MemberId(0));
        assert_eq!(second, MemberId(1));
        assert_eq!(class.properties().count(), 1);
    }
}
