//! Rendering of edit plans into C# declarations.
//!
//! Templates are fixed and parameterized only by property name, field name,
//! type and compare method. The region is always emitted as:
//!
//! ```text
//! #region NotifyPropertyChangedGenerator
//!
//! public event PropertyChangedEventHandler PropertyChanged;
//!
//! private int myProperty;
//! private static readonly PropertyChangedEventArgs myPropertyPropertyChangedEventArgs = new PropertyChangedEventArgs(nameof(MyProperty));
//!
//! private void SetProperty<T>(ref T field, T value, PropertyChangedEventArgs ev)
//! {
//!     ...
//! }
//!
//! #endregion
//! ```
//!
//! [`emit`] applies a plan to the host-neutral model, which is what the
//! idempotence guarantee is stated against; `crate::csharp::rewrite` applies
//! the same plan to source text.

use crate::config::CompareMethod;
use crate::conventions::{
    EVENT_ARGS_TYPE, EVENT_HANDLER_TYPE, EVENT_NAME, REGION_NAME, SETTER_HELPER_NAME,
};
use crate::plan::{EditPlan, GeneratedMember, GeneratedProperty};
use crate::syntax::{
    Accessor, AccessorKind, ArgumentValue, ClassDecl, CodeRange, EventFieldDecl, FieldDecl,
    MarkerUsage, Member, MemberId, MemberKind, MethodDecl, PropertyDecl, RegionTag, Visibility,
};

/// Renders the accessor list of a rewritten property.
///
/// ```
/// use notify_gen_lib::emit::render_accessors;
/// use notify_gen_lib::plan::GeneratedProperty;
///
/// let property = GeneratedProperty {
///     name: "MyProperty".into(),
///     type_name: "int".into(),
///     modifiers: vec!["public".into()],
///     markers: Vec::new(),
///     field: "myProperty".into(),
///     getter_visibility: None,
///     setter_visibility: None,
/// };
/// assert_eq!(
///     render_accessors(&property),
///     "{ get { return myProperty; } set { SetProperty(ref myProperty, value, myPropertyPropertyChangedEventArgs); } }"
/// );
/// ```
pub fn render_accessors(property: &GeneratedProperty) -> String {
    let getter_prefix = visibility_prefix(property.getter_visibility);
    let setter_prefix = visibility_prefix(property.setter_visibility);
    let field = &property.field;
    let args = property.event_args_field();

    format!(
        "{{ {getter_prefix}get {{ return {field}; }} {setter_prefix}set {{ {SETTER_HELPER_NAME}(ref {field}, value, {args}); }} }}"
    )
}

/// Renders a complete property declaration on one line, markers included.
pub fn render_property(property: &GeneratedProperty) -> String {
    let mut out = String::new();
    for marker in &property.markers {
        out.push_str(&render_marker(marker));
        out.push(' ');
    }
    for modifier in &property.modifiers {
        out.push_str(modifier);
        out.push(' ');
    }
    out.push_str(&format!(
        "{} {} {}",
        property.type_name,
        property.name,
        render_accessors(property)
    ));
    out
}

/// Renders a marker usage as an attribute list (`[Notify("Plain")]`).
pub fn render_marker(marker: &MarkerUsage) -> String {
    if marker.arguments.is_empty() {
        return format!("[{}]", marker.name);
    }

    let arguments = marker
        .arguments
        .iter()
        .map(|argument| {
            let value = match &argument.value {
                ArgumentValue::Text(text) => format!("\"{text}\""),
                ArgumentValue::Enumerant {
                    qualifier: Some(qualifier),
                    name,
                } => format!("{qualifier}.{name}"),
                ArgumentValue::Enumerant {
                    qualifier: None,
                    name,
                } => name.clone(),
                ArgumentValue::Absent => "null".to_string(),
                ArgumentValue::Expression(expression) => expression.clone(),
            };
            match &argument.name {
                Some(name) => format!("{name}: {value}"),
                None => value,
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("[{}({arguments})]", marker.name)
}

/// Renders one generated member as unindented lines.
pub fn render_member(member: &GeneratedMember) -> Vec<String> {
    match member {
        GeneratedMember::Event => {
            vec![format!("public event {EVENT_HANDLER_TYPE} {EVENT_NAME};")]
        }
        GeneratedMember::BackingField {
            field,
            type_name,
            initializer,
            ..
        } => match initializer {
            Some(initializer) => vec![format!("private {type_name} {field} = {initializer};")],
            None => vec![format!("private {type_name} {field};")],
        },
        GeneratedMember::CachedName { property, field } => vec![format!(
            "private static readonly {EVENT_ARGS_TYPE} {field} = {};",
            cached_name_initializer(property)
        )],
        GeneratedMember::SetterHelper { compare_method } => setter_helper(*compare_method),
    }
}

fn cached_name_initializer(property: &str) -> String {
    format!("new {EVENT_ARGS_TYPE}(nameof({property}))")
}

fn setter_helper(compare_method: CompareMethod) -> Vec<String> {
    let signature =
        format!("private void {SETTER_HELPER_NAME}<T>(ref T field, T value, {EVENT_ARGS_TYPE} ev)");
    let notify = format!("{EVENT_NAME}?.Invoke(this, ev);");

    let guard = match compare_method {
        CompareMethod::EqualityComparer => Some(
            "if (!System.Collections.Generic.EqualityComparer<T>.Default.Equals(field, value))",
        ),
        CompareMethod::ReferenceEquals => Some("if (!object.ReferenceEquals(field, value))"),
        CompareMethod::None => None,
    };

    let mut lines = vec![signature, "{".to_string()];
    match guard {
        Some(guard) => {
            lines.push(format!("    {guard}"));
            lines.push("    {".to_string());
            lines.push("        field = value;".to_string());
            lines.push(format!("        {notify}"));
            lines.push("    }".to_string());
        }
        None => {
            lines.push("    field = value;".to_string());
            lines.push(format!("    {notify}"));
        }
    }
    lines.push("}".to_string());
    lines
}

/// Renders the whole generated region.
///
/// Every line is prefixed with `indent` (blank lines stay empty) and joined
/// with `newline`; the result has no trailing newline.
pub fn render_region(plan: &EditPlan, indent: &str, newline: &str) -> String {
    let mut lines: Vec<String> = vec![format!("#region {REGION_NAME}"), String::new()];

    let mut previous: Option<&GeneratedMember> = None;
    for member in &plan.members_to_append {
        // Field pairs sit together; everything else is separated by a blank line.
        let grouped = matches!(
            (previous, member),
            (
                Some(GeneratedMember::BackingField { .. } | GeneratedMember::CachedName { .. }),
                GeneratedMember::BackingField { .. } | GeneratedMember::CachedName { .. }
            )
        );
        if previous.is_some() && !grouped {
            lines.push(String::new());
        }
        lines.extend(render_member(member));
        previous = Some(member);
    }

    lines.push(String::new());
    lines.push("#endregion".to_string());

    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join(newline)
}

/// Applies a plan to the host-neutral model.
///
/// Kept members stay in order, selected properties are replaced in place, and
/// the new region is appended as the final members. Member ids are reassigned
/// in declaration order; kept members keep their source ranges.
pub fn emit(class: &ClassDecl, plan: &EditPlan) -> ClassDecl {
    let mut emitted = ClassDecl {
        name: class.name.clone(),
        markers: class.markers.clone(),
        base_types: class.base_types.clone(),
        members: Vec::with_capacity(class.members.len() + plan.members_to_append.len() + 2),
        range: class.range,
    };

    if let Some(interface) = &plan.interface_to_ensure {
        emitted.base_types.push(interface.clone());
    }

    for member in &class.members {
        if plan.removes(member.id) {
            continue;
        }

        let kind = match plan.rewrite_for(member.id) {
            Some(replacement) => MemberKind::Property(rewritten_property(replacement)),
            None => member.kind.clone(),
        };
        push(&mut emitted, kind, member.range);
    }

    push(
        &mut emitted,
        MemberKind::Region(RegionTag::Start {
            name: REGION_NAME.to_string(),
        }),
        None,
    );
    for member in &plan.members_to_append {
        push(&mut emitted, generated_member_kind(member), None);
    }
    push(&mut emitted, MemberKind::Region(RegionTag::End), None);

    emitted
}

fn push(class: &mut ClassDecl, kind: MemberKind, range: Option<CodeRange>) {
    let id = MemberId(class.members.len());
    class.members.push(Member { id, kind, range });
}

fn rewritten_property(property: &GeneratedProperty) -> PropertyDecl {
    PropertyDecl {
        name: property.name.clone(),
        type_name: property.type_name.clone(),
        modifiers: property.modifiers.clone(),
        markers: property.markers.clone(),
        accessors: vec![
            Accessor {
                kind: AccessorKind::Get,
                visibility: property.getter_visibility,
                has_body: true,
            },
            Accessor {
                kind: AccessorKind::Set,
                visibility: property.setter_visibility,
                has_body: true,
            },
        ],
        initializer: None,
    }
}

fn generated_member_kind(member: &GeneratedMember) -> MemberKind {
    match member {
        GeneratedMember::Event => MemberKind::EventField(EventFieldDecl {
            type_name: EVENT_HANDLER_TYPE.to_string(),
            names: vec![EVENT_NAME.to_string()],
        }),
        GeneratedMember::BackingField {
            field,
            type_name,
            initializer,
            ..
        } => MemberKind::Field(FieldDecl {
            type_name: type_name.clone(),
            names: vec![field.clone()],
            modifiers: vec!["private".to_string()],
            initializer: initializer.clone(),
        }),
        GeneratedMember::CachedName { property, field } => MemberKind::Field(FieldDecl {
            type_name: EVENT_ARGS_TYPE.to_string(),
            names: vec![field.clone()],
            modifiers: vec![
                "private".to_string(),
                "static".to_string(),
                "readonly".to_string(),
            ],
            initializer: Some(cached_name_initializer(property)),
        }),
        GeneratedMember::SetterHelper { .. } => MemberKind::Method(MethodDecl {
            name: SETTER_HELPER_NAME.to_string(),
        }),
    }
}

fn visibility_prefix(visibility: Option<Visibility>) -> String {
    visibility
        .map(|visibility| format!("{} ", visibility.keyword()))
        .unwrap_or_default()
}
