use std::fmt;

use serde::{Deserialize, Serialize};

/// Naming convention of the generated backing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NamingConvention {
    /// lowerCamelCase of the property name.
    #[default]
    Plain,
    /// `_` + the plain name.
    LeadingUnderscore,
    /// The plain name + `_`.
    TrailingUnderscore,
}

impl NamingConvention {
    pub const ALL: [Self; 3] = [
        Self::Plain,
        Self::LeadingUnderscore,
        Self::TrailingUnderscore,
    ];

    /// Returns the token naming this convention in marker arguments.
    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "Plain",
            Self::LeadingUnderscore => "LeadingUnderscore",
            Self::TrailingUnderscore => "TrailingUnderscore",
        }
    }

    /// Parses an exact token (`"LeadingUnderscore"`).
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|convention| convention.name() == token)
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Compare method used by the generated setter helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareMethod {
    /// Notify on every set.
    None,
    /// Notify unless old and new values are the same instance.
    ReferenceEquals,
    /// Notify unless old and new values are equal under the default comparer.
    #[default]
    EqualityComparer,
}

impl CompareMethod {
    pub const ALL: [Self; 3] = [Self::None, Self::ReferenceEquals, Self::EqualityComparer];

    /// Returns the token naming this compare method in marker arguments.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::ReferenceEquals => "ReferenceEquals",
            Self::EqualityComparer => "EqualityComparer",
        }
    }

    /// Parses an exact token (`"ReferenceEquals"`).
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|method| method.name() == token)
    }
}

impl fmt::Display for CompareMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Resolved generation policy for one selected property.
///
/// `compare_method` is resolved once per class, so every property of a class
/// carries the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub naming_convention: NamingConvention,
    pub compare_method: CompareMethod,
}

/// Derives the backing field name for a property.
///
/// The first character is lowercased, then the convention's underscore is
/// applied. The result depends only on the inputs.
///
/// ## Examples
///
/// ```
/// use notify_gen_lib::{NamingConvention, field_name};
///
/// assert_eq!(field_name("MyProperty", NamingConvention::Plain), "myProperty");
/// assert_eq!(field_name("MyProperty", NamingConvention::LeadingUnderscore), "_myProperty");
/// assert_eq!(field_name("MyProperty", NamingConvention::TrailingUnderscore), "myProperty_");
/// ```
pub fn field_name(property_name: &str, convention: NamingConvention) -> String {
    let mut chars = property_name.chars();
    let plain = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };

    match convention {
        NamingConvention::Plain => plain,
        NamingConvention::LeadingUnderscore => format!("_{plain}"),
        NamingConvention::TrailingUnderscore => format!("{plain}_"),
    }
}

/// Name of the cached event-args value that accompanies a backing field.
pub fn event_args_name(field_name: &str) -> String {
    format!("{field_name}{}", crate::conventions::EVENT_ARGS_TYPE)
}
