//! Re-discovery of the generated region inside a class body.
//!
//! The region is the span of members between a `#region` tag carrying the
//! well-known name and the `#endregion` that closes it. Nested region pairs
//! inside it are matched by depth. Nothing is persisted between runs; the view
//! is recomputed from the live member list on every pass.

use std::collections::{BTreeMap, BTreeSet};

use crate::conventions::{self, REGION_NAME, SETTER_HELPER_NAME};
use crate::syntax::{ClassDecl, Member, MemberKind, RegionTag};

/// A read-only view of the previously generated block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedRegion {
    /// Index of the `#region` tag in the member list.
    pub start: usize,
    /// Index of the closing `#endregion` tag, or of the last member when the
    /// tag is never closed (inclusive).
    pub end: usize,
    /// Normalised field-like identifiers found inside the span.
    pub contained_fields: BTreeSet<String>,
    /// Initializers of backing fields, keyed like `contained_fields`.
    pub field_initializers: BTreeMap<String, String>,
    /// A method named like the setter helper exists inside the span.
    pub contains_setter_helper: bool,
}

impl GeneratedRegion {
    /// Returns true when the member at `index` lies within the span.
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Members inside the span, tags included.
    pub fn members<'c>(&self, class: &'c ClassDecl) -> &'c [Member] {
        let end = (self.end + 1).min(class.members.len());
        class.members.get(self.start..end).unwrap_or_default()
    }

    /// True when some field inside the span plausibly backs `property_name`.
    pub fn backs(&self, property_name: &str) -> bool {
        self.contained_fields.contains(&property_name.to_lowercase())
    }

    /// Initializer of the field backing `property_name`, if any.
    pub fn initializer_for(&self, property_name: &str) -> Option<&str> {
        self.field_initializers
            .get(&property_name.to_lowercase())
            .map(String::as_str)
    }
}

/// Normalises a field name for tolerant matching against property names.
///
/// One leading and one trailing underscore are stripped and the result is
/// lowercased, so `_myProperty`, `myProperty_` and `myProperty` all map to
/// `myproperty`.
pub fn field_key(name: &str) -> String {
    let name = name.strip_prefix('_').unwrap_or(name);
    let name = name.strip_suffix('_').unwrap_or(name);
    name.to_lowercase()
}

/// Locates the generated region of a class.
///
/// ## Returns
/// `None` when no `#region` tag carries the well-known name. A start tag that
/// is never closed runs to the last member of the class.
pub fn locate(class: &ClassDecl) -> Option<GeneratedRegion> {
    let start = class.members.iter().position(|member| {
        matches!(
            member.region_tag(),
            Some(RegionTag::Start { name }) if name.trim() == REGION_NAME
        )
    })?;

    let mut depth = 0usize;
    let mut end = None;
    for (index, member) in class.members.iter().enumerate().skip(start) {
        match member.region_tag() {
            Some(RegionTag::Start { .. }) => depth += 1,
            Some(RegionTag::End) => {
                depth -= 1;
                if depth == 0 {
                    end = Some(index);
                    break;
                }
            }
            None => {}
        }
    }

    let end = end.unwrap_or_else(|| {
        tracing::debug!(class = %class.name, "generated region is never closed");
        class.members.len() - 1
    });

    let mut region = GeneratedRegion {
        start,
        end,
        ..GeneratedRegion::default()
    };

    for member in &class.members[start..=end] {
        match &member.kind {
            // Cached event args are not backing fields.
            MemberKind::Field(field) if conventions::is_event_args_type(&field.type_name) => {}
            MemberKind::Field(field) => {
                for name in &field.names {
                    let key = field_key(name);
                    if let Some(initializer) = &field.initializer {
                        region
                            .field_initializers
                            .entry(key.clone())
                            .or_insert_with(|| initializer.clone());
                    }
                    region.contained_fields.insert(key);
                }
            }
            MemberKind::Method(method) if method.name == SETTER_HELPER_NAME => {
                region.contains_setter_helper = true;
            }
            _ => {}
        }
    }

    tracing::trace!(
        class = %class.name,
        start,
        end,
        fields = region.contained_fields.len(),
        helper = region.contains_setter_helper,
        "located generated region"
    );

    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{FieldDecl, MethodDecl};
    use crate::test_utils::{field, region_end, region_start};

    fn class_with(members: Vec<MemberKind>) -> ClassDecl {
        let mut class = ClassDecl::new("MyClass");
        for kind in members {
            class.push(kind, None);
        }
        class
    }

    #[test]
    fn field_key_strips_one_underscore_each_side() {
        assert_eq!(field_key("_myProperty"), "myproperty");
        assert_eq!(field_key("myProperty_"), "myproperty");
        assert_eq!(field_key("_myProperty_"), "myproperty");
        assert_eq!(field_key("__myProperty"), "_myproperty");
        assert_eq!(field_key("MyProperty"), "myproperty");
    }

    #[test]
    fn no_region_tag_means_absent() {
        let class = class_with(vec![field("int", "myProperty")]);
        assert!(locate(&class).is_none());
    }

    #[test]
    fn other_region_names_are_ignored() {
        let class = class_with(vec![
            region_start("Fields"),
            field("int", "myProperty"),
            region_end(),
        ]);
        assert!(locate(&class).is_none());
    }

    #[test]
    fn collects_fields_and_helper_inside_span() {
        let class = class_with(vec![
            field("int", "outside"),
            region_start(REGION_NAME),
            field("int", "_myProperty"),
            MemberKind::Field(FieldDecl {
                type_name: "PropertyChangedEventArgs".into(),
                names: vec!["otherPropertyChangedEventArgs".into()],
                modifiers: vec!["private".into(), "static".into(), "readonly".into()],
                initializer: Some("new PropertyChangedEventArgs(nameof(Other))".into()),
            }),
            MemberKind::Method(MethodDecl {
                name: SETTER_HELPER_NAME.into(),
            }),
            region_end(),
        ]);

        let region = locate(&class).unwrap();
        assert_eq!((region.start, region.end), (1, 5));
        assert!(region.backs("MyProperty"));
        assert!(!region.backs("Other"));
        assert!(!region.backs("Outside"));
        assert!(region.contains_setter_helper);
        assert!(region.field_initializers.is_empty());
    }

    #[test]
    fn nested_regions_are_matched_by_depth() {
        let class = class_with(vec![
            region_start(REGION_NAME),
            region_start("Inner"),
            field("int", "inner"),
            region_end(),
            field("int", "myProperty"),
            region_end(),
            field("int", "after"),
        ]);

        let region = locate(&class).unwrap();
        assert_eq!(region.end, 5);
        assert!(region.backs("Inner"));
        assert!(region.backs("MyProperty"));
        assert!(!region.backs("After"));
        assert_eq!(region.members(&class).len(), 6);
    }

    #[test]
    fn unterminated_region_runs_to_last_member() {
        let class = class_with(vec![
            field("int", "before"),
            region_start(REGION_NAME),
            field("int", "myProperty"),
            field("int", "other"),
        ]);
        let region = locate(&class).unwrap();
        assert_eq!((region.start, region.end), (1, 3));
        assert!(region.backs("MyProperty"));
        assert!(region.backs("Other"));
        assert!(!region.backs("Before"));
        assert_eq!(region.members(&class).len(), 3);
    }

    #[test]
    fn backing_field_initializers_are_recorded() {
        let class = class_with(vec![
            region_start(REGION_NAME),
            MemberKind::Field(FieldDecl {
                type_name: "int".into(),
                names: vec!["_count".into()],
                modifiers: vec!["private".into()],
                initializer: Some("5".into()),
            }),
            region_end(),
        ]);

        let region = locate(&class).unwrap();
        assert_eq!(region.initializer_for("Count"), Some("5"));
        assert_eq!(region.initializer_for("Other"), None);
    }
}
