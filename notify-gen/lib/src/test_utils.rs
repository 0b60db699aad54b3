//! Shared model fixtures for unit tests.

use crate::marker::{MarkerResolver, NameResolver, Resolution};
use crate::settings::GeneratorSettings;
use crate::syntax::{ClassDecl, FieldDecl, MarkerUsage, MemberKind, PropertyDecl, RegionTag};

/// A `[Notify]` usage without arguments.
pub fn notify() -> MarkerUsage {
    MarkerUsage::new("Notify")
}

/// A public auto-property `{ get; set; }` without markers.
pub fn plain_property(name: &str, type_name: &str) -> PropertyDecl {
    PropertyDecl::new(name, type_name)
}

/// A public auto-property carrying `markers`.
pub fn marked_property(name: &str, type_name: &str, markers: Vec<MarkerUsage>) -> PropertyDecl {
    PropertyDecl {
        markers,
        ..PropertyDecl::new(name, type_name)
    }
}

/// A class whose members are exactly `properties`, in order.
pub fn class_with_properties(name: &str, properties: Vec<PropertyDecl>) -> ClassDecl {
    let mut class = ClassDecl::new(name);
    for property in properties {
        class.push(MemberKind::Property(property), None);
    }
    class
}

/// A private single-declarator field.
pub fn field(type_name: &str, name: &str) -> MemberKind {
    MemberKind::Field(FieldDecl {
        type_name: type_name.to_string(),
        names: vec![name.to_string()],
        modifiers: vec!["private".to_string()],
        initializer: None,
    })
}

pub fn region_start(name: &str) -> MemberKind {
    MemberKind::Region(RegionTag::Start {
        name: name.to_string(),
    })
}

pub fn region_end() -> MemberKind {
    MemberKind::Region(RegionTag::End)
}

/// Resolves `class` with `settings` and name-only symbol resolution.
///
/// Panics when the class is not a generation target.
pub fn resolve_with(settings: &GeneratorSettings, class: &ClassDecl) -> Resolution {
    let symbols = NameResolver::new();
    MarkerResolver::new(settings, &symbols)
        .resolve(class)
        .expect("class should be a generation target")
}

/// Resolves `class` with default settings.
pub fn resolve_default(class: &ClassDecl) -> Resolution {
    resolve_with(&GeneratorSettings::default(), class)
}
