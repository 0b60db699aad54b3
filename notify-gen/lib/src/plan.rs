//! Plan building: which members to drop, rewrite and append.
//!
//! A stale class is always regenerated in full. The previous region and any
//! hand-written change-notification event are removed, every selected
//! property is rewritten to go through the setter helper, and a fresh region
//! is appended. The plan is derived from the resolver and detector output
//! only; markers are never re-interpreted here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::{self, CompareMethod};
use crate::conventions::INTERFACE_NAME;
use crate::marker::Resolution;
use crate::region::{self, GeneratedRegion};
use crate::staleness::StaleReason;
use crate::syntax::{ClassDecl, MarkerUsage, MemberId, MemberKind, Visibility};

/// A member of the generated region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedMember {
    /// `public event PropertyChangedEventHandler PropertyChanged;`
    Event,
    /// `private T field;`
    BackingField {
        property: String,
        field: String,
        type_name: String,
        initializer: Option<String>,
    },
    /// The cached `PropertyChangedEventArgs` for a property.
    CachedName { property: String, field: String },
    /// The shared comparison-guarded setter.
    SetterHelper { compare_method: CompareMethod },
}

/// Replacement declaration for a selected property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProperty {
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub markers: Vec<MarkerUsage>,
    /// Backing field the accessors read and write.
    pub field: String,
    /// Explicit getter visibility kept from the original declaration.
    pub getter_visibility: Option<Visibility>,
    /// Setter visibility; `Private` when the original had no setter.
    pub setter_visibility: Option<Visibility>,
}

impl GeneratedProperty {
    /// Name of the cached event-args value passed to the setter helper.
    pub fn event_args_field(&self) -> String {
        config::event_args_name(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRewrite {
    pub member: MemberId,
    pub replacement: GeneratedProperty,
}

/// Structured edit plan for one stale class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    pub class_name: String,
    pub reason: StaleReason,
    /// Existing members to drop: the previous region and stray events.
    pub members_to_remove: BTreeSet<MemberId>,
    /// One rewrite per selected property, in declaration order.
    pub members_to_rewrite: Vec<PropertyRewrite>,
    /// Members of the new region, in emission order.
    pub members_to_append: Vec<GeneratedMember>,
    /// Capability the class must declare, when missing.
    pub interface_to_ensure: Option<String>,
    pub compare_method: CompareMethod,
}

impl EditPlan {
    pub fn removes(&self, member: MemberId) -> bool {
        self.members_to_remove.contains(&member)
    }

    pub fn rewrite_for(&self, member: MemberId) -> Option<&GeneratedProperty> {
        self.members_to_rewrite
            .iter()
            .find(|rewrite| rewrite.member == member)
            .map(|rewrite| &rewrite.replacement)
    }
}

/// Builds the edit plan for a class the detector found stale.
pub fn build(class: &ClassDecl, resolution: &Resolution, reason: StaleReason) -> EditPlan {
    let region = region::locate(class);
    build_with_region(class, region.as_ref(), resolution, reason)
}

/// Same as [`build`] with an already located region.
pub fn build_with_region(
    class: &ClassDecl,
    region: Option<&GeneratedRegion>,
    resolution: &Resolution,
    reason: StaleReason,
) -> EditPlan {
    let mut members_to_remove = BTreeSet::new();
    let mut members_to_rewrite = Vec::with_capacity(resolution.selected.len());

    for (index, member) in class.members.iter().enumerate() {
        if let Some(selected) = resolution.get(member.id) {
            let Some(property) = member.as_property() else {
                continue;
            };

            let marker = &selected.marker;
            let setter_visibility = match (marker.has_setter, marker.setter_visibility) {
                (true, visibility) => visibility,
                (false, _) => Some(Visibility::Private),
            };

            members_to_rewrite.push(PropertyRewrite {
                member: member.id,
                replacement: GeneratedProperty {
                    name: property.name.clone(),
                    type_name: property.type_name.clone(),
                    modifiers: property.modifiers.clone(),
                    markers: property.markers.clone(),
                    field: config::field_name(
                        &property.name,
                        selected.config.naming_convention,
                    ),
                    getter_visibility: marker.getter_visibility,
                    setter_visibility,
                },
            });
            continue;
        }

        let in_region = region.is_some_and(|region| region.contains(index));
        let stray_event = matches!(
            &member.kind,
            MemberKind::EventField(event) if event.is_change_notification_event()
        );
        if in_region || stray_event {
            members_to_remove.insert(member.id);
        }
    }

    let mut members_to_append = Vec::with_capacity(resolution.selected.len() * 2 + 2);
    members_to_append.push(GeneratedMember::Event);
    for rewrite in &members_to_rewrite {
        let property = &rewrite.replacement;
        let initializer = class
            .member(rewrite.member)
            .and_then(|member| member.as_property())
            .and_then(|declared| declared.initializer.clone())
            .or_else(|| {
                region
                    .and_then(|region| region.initializer_for(&property.name))
                    .map(str::to_string)
            });

        members_to_append.push(GeneratedMember::BackingField {
            property: property.name.clone(),
            field: property.field.clone(),
            type_name: property.type_name.clone(),
            initializer,
        });
        members_to_append.push(GeneratedMember::CachedName {
            property: property.name.clone(),
            field: property.event_args_field(),
        });
    }
    members_to_append.push(GeneratedMember::SetterHelper {
        compare_method: resolution.compare_method,
    });

    let interface_to_ensure =
        (!class.declares_change_notification()).then(|| INTERFACE_NAME.to_string());

    tracing::debug!(
        class = %class.name,
        remove = members_to_remove.len(),
        rewrite = members_to_rewrite.len(),
        append = members_to_append.len(),
        add_interface = interface_to_ensure.is_some(),
        "built edit plan"
    );

    EditPlan {
        class_name: class.name.clone(),
        reason,
        members_to_remove,
        members_to_rewrite,
        members_to_append,
        interface_to_ensure,
        compare_method: resolution.compare_method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{REGION_NAME, SETTER_HELPER_NAME};
    use crate::syntax::{Accessor, AccessorKind, EventFieldDecl, FieldDecl, MethodDecl};
    use crate::test_utils::{
        class_with_properties, field, marked_property, notify, plain_property, region_end,
        region_start, resolve_default,
    };

    fn plan_for(class: &ClassDecl) -> EditPlan {
        let resolution = resolve_default(class);
        build(class, &resolution, StaleReason::MissingRegion)
    }

    #[test]
    fn end_to_end_two_properties_without_region() {
        let class = class_with_properties(
            "MyClass",
            vec![
                marked_property("MyProperty", "int", vec![notify()]),
                marked_property("MyProperty2", "string", vec![notify()]),
            ],
        );

        let plan = plan_for(&class);
        assert_eq!(plan.interface_to_ensure.as_deref(), Some("INotifyPropertyChanged"));
        assert!(plan.members_to_remove.is_empty());
        assert_eq!(plan.members_to_rewrite.len(), 2);
        assert_eq!(plan.members_to_rewrite[0].replacement.field, "myProperty");
        assert_eq!(plan.members_to_rewrite[1].replacement.field, "myProperty2");
        assert_eq!(
            plan.members_to_append,
            vec![
                GeneratedMember::Event,
                GeneratedMember::BackingField {
                    property: "MyProperty".into(),
                    field: "myProperty".into(),
                    type_name: "int".into(),
                    initializer: None,
                },
                GeneratedMember::CachedName {
                    property: "MyProperty".into(),
                    field: "myPropertyPropertyChangedEventArgs".into(),
                },
                GeneratedMember::BackingField {
                    property: "MyProperty2".into(),
                    field: "myProperty2".into(),
                    type_name: "string".into(),
                    initializer: None,
                },
                GeneratedMember::CachedName {
                    property: "MyProperty2".into(),
                    field: "myProperty2PropertyChangedEventArgs".into(),
                },
                GeneratedMember::SetterHelper {
                    compare_method: CompareMethod::EqualityComparer,
                },
            ]
        );
    }

    #[test]
    fn previous_region_and_stray_event_are_removed() {
        let mut class = ClassDecl::new("MyClass");
        class.base_types.push("INotifyPropertyChanged".into());
        let event = class.push(
            MemberKind::EventField(EventFieldDecl {
                type_name: "System.ComponentModel.PropertyChangedEventHandler".into(),
                names: vec!["PropertyChanged".into()],
            }),
            None,
        );
        let property = class.push(
            MemberKind::Property(marked_property("MyProperty", "int", vec![notify()])),
            None,
        );
        let untouched = class.push(field("int", "counter"), None);
        let start = class.push(region_start(REGION_NAME), None);
        let old_field = class.push(field("int", "myProperty777"), None);
        let helper = class.push(
            MemberKind::Method(MethodDecl {
                name: SETTER_HELPER_NAME.into(),
            }),
            None,
        );
        let end = class.push(region_end(), None);

        let plan = plan_for(&class);
        assert_eq!(
            plan.members_to_remove,
            BTreeSet::from([event, start, old_field, helper, end])
        );
        assert!(!plan.removes(property));
        assert!(!plan.removes(untouched));
        assert!(plan.interface_to_ensure.is_none());
    }

    #[test]
    fn selected_property_inside_region_is_rewritten_not_removed() {
        let mut class = ClassDecl::new("MyClass");
        class.push(region_start(REGION_NAME), None);
        let property = class.push(
            MemberKind::Property(marked_property("MyProperty", "int", vec![notify()])),
            None,
        );
        class.push(region_end(), None);

        let plan = plan_for(&class);
        assert!(!plan.removes(property));
        assert!(plan.rewrite_for(property).is_some());
        assert_eq!(plan.members_to_remove.len(), 2);
    }

    #[test]
    fn other_events_are_kept() {
        let mut class = ClassDecl::new("MyClass");
        let other = class.push(
            MemberKind::EventField(EventFieldDecl {
                type_name: "EventHandler".into(),
                names: vec!["Changed".into()],
            }),
            None,
        );
        class.push(
            MemberKind::Property(marked_property("A", "int", vec![notify()])),
            None,
        );

        let plan = plan_for(&class);
        assert!(!plan.removes(other));
    }

    #[test]
    fn missing_setter_becomes_private() {
        let mut getter_only = marked_property("A", "int", vec![notify()]);
        getter_only.accessors.retain(|accessor| accessor.kind == AccessorKind::Get);
        let mut init_only = marked_property("B", "int", vec![notify()]);
        init_only.accessors[1] = Accessor {
            kind: AccessorKind::Init,
            visibility: None,
            has_body: false,
        };
        let mut protected_setter = marked_property("C", "int", vec![notify()]);
        protected_setter.accessors[1].visibility = Some(Visibility::Protected);

        let class = class_with_properties(
            "MyClass",
            vec![
                getter_only,
                init_only,
                protected_setter,
                marked_property("D", "int", vec![notify()]),
            ],
        );

        let plan = plan_for(&class);
        let visibilities = plan
            .members_to_rewrite
            .iter()
            .map(|rewrite| rewrite.replacement.setter_visibility)
            .collect::<Vec<_>>();
        assert_eq!(
            visibilities,
            vec![
                Some(Visibility::Private),
                Some(Visibility::Private),
                Some(Visibility::Protected),
                None,
            ]
        );
    }

    #[test]
    fn initializer_moves_to_backing_field() {
        let mut property = marked_property("Count", "int", vec![notify()]);
        property.initializer = Some("5".into());
        let class = class_with_properties("MyClass", vec![property]);

        let plan = plan_for(&class);
        assert!(plan.members_to_append.contains(&GeneratedMember::BackingField {
            property: "Count".into(),
            field: "count".into(),
            type_name: "int".into(),
            initializer: Some("5".into()),
        }));
    }

    #[test]
    fn initializer_is_kept_from_previous_region() {
        let mut class = ClassDecl::new("MyClass");
        class.push(
            MemberKind::Property(marked_property("Count", "int", vec![notify()])),
            None,
        );
        class.push(region_start(REGION_NAME), None);
        class.push(
            MemberKind::Field(FieldDecl {
                type_name: "int".into(),
                names: vec!["_count".into()],
                modifiers: vec!["private".into()],
                initializer: Some("42".into()),
            }),
            None,
        );
        class.push(region_end(), None);

        let plan = plan_for(&class);
        assert!(plan.members_to_append.contains(&GeneratedMember::BackingField {
            property: "Count".into(),
            field: "count".into(),
            type_name: "int".into(),
            initializer: Some("42".into()),
        }));
    }

    #[test]
    fn unselected_properties_are_left_alone() {
        let mut class = class_with_properties(
            "MyClass",
            vec![
                plain_property("A", "int"),
                marked_property("B", "int", vec![notify()]),
            ],
        );
        class.base_types.push("Base".into());

        let plan = plan_for(&class);
        assert_eq!(plan.members_to_rewrite.len(), 1);
        assert_eq!(plan.members_to_rewrite[0].replacement.name, "B");
    }
}
