use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use super::directives;
use crate::error::NotifyGenError;
use crate::syntax::{
    Accessor, AccessorKind, ArgumentValue, ClassDecl, CodeRange, EventFieldDecl, FieldDecl,
    MarkerArgument, MarkerUsage, MemberId, MemberKind, MethodDecl, PropertyDecl, Visibility,
};

/// File extension handled by the C# host.
pub const EXTENSION: &str = "cs";

/// Represents a parsed C# compilation unit backed by tree-sitter.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the source was read from.
    pub file: PathBuf,
    source: String,
    tree: Tree,
}

/// A class lowered into the host-neutral model, plus where its parts live in
/// the source text.
#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub decl: ClassDecl,
    pub layout: ClassLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout {
    /// Byte range of the `{ ... }` body.
    pub body: Range<usize>,
    /// Byte offset of the closing `}`.
    pub close_brace: usize,
    /// Where a new base list goes: after the name, type parameters or
    /// primary constructor parameters.
    pub header_end: usize,
    /// End of the existing base list, if any.
    pub base_list_end: Option<usize>,
    /// Indentation of the class declaration line.
    pub class_indent: String,
    /// Indentation of member declarations.
    pub member_indent: String,
    /// Accessor list through the end of each property (initializer included).
    pub property_tails: BTreeMap<MemberId, Range<usize>>,
}

impl SourceFile {
    /// Reads and parses a C# file.
    ///
    /// ## Errors
    /// Returns an error if the path is not a `.cs` file, cannot be read, or
    /// cannot be parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NotifyGenError> {
        let file = path.as_ref().to_path_buf();
        let is_csharp = file
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case(EXTENSION));
        if !is_csharp {
            return Err(NotifyGenError::UnsupportedLanguage { path: file });
        }

        let source = std::fs::read_to_string(&file).map_err(|source| NotifyGenError::Io {
            path: file.clone(),
            source,
        })?;

        Self::parse(file, source)
    }

    /// Parses C# source text; `path` is only used for reporting.
    ///
    /// ## Errors
    /// Returns an error if tree-sitter cannot load the grammar or produce a tree.
    pub fn parse<P: AsRef<Path>>(
        path: P,
        source: impl Into<String>,
    ) -> Result<Self, NotifyGenError> {
        let file = path.as_ref().to_path_buf();
        let source = source.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|_| NotifyGenError::UnsupportedLanguage { path: file.clone() })?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| NotifyGenError::ParseFailed { path: file.clone() })?;

        Ok(Self { file, source, tree })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when tree-sitter had to recover from syntax errors.
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Lowers every top-level and namespace-level class declaration.
    ///
    /// Classes nested in other types are not lowered; they appear as `Other`
    /// members of their enclosing class.
    pub fn classes(&self) -> Vec<ParsedClass> {
        let mut nodes = Vec::new();
        collect_class_nodes(self.tree.root_node(), &mut nodes);

        nodes
            .into_iter()
            .filter_map(|node| self.lower_class(node))
            .collect()
    }

    /// True when a `using <namespace>;` directive exists anywhere in the file.
    pub fn imports_namespace(&self, namespace: &str) -> bool {
        let mut stack = vec![self.tree.root_node()];

        while let Some(node) = stack.pop() {
            if node.kind() == "using_directive" {
                let directive = self.text(node).trim_end_matches(';');
                let tokens = directive.split_whitespace().collect::<Vec<_>>();
                let is_plain = !tokens.iter().any(|token| *token == "=" || *token == "static");
                if is_plain && tokens.last() == Some(&namespace) {
                    return true;
                }
                continue;
            }

            if matches!(
                node.kind(),
                "compilation_unit" | "namespace_declaration" | "declaration_list"
            ) {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    stack.push(child);
                }
            }
        }

        false
    }

    /// End of the last top-level using directive, if any.
    pub(crate) fn last_top_level_using(&self) -> Option<usize> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|child| child.kind() == "using_directive")
            .last()
            .map(|node| node.end_byte())
    }

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn lower_class(&self, node: Node<'_>) -> Option<ParsedClass> {
        let name_node = node.child_by_field_name("name")?;
        let body = node.child_by_field_name("body")?;

        let mut decl = ClassDecl::new(self.text(name_node));
        decl.range = Some(range_for_node(node));

        let mut header_end = name_node.end_byte();
        let mut base_list = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "attribute_list" => decl.markers.extend(self.markers(child)),
                "type_parameter_list" | "parameter_list" => header_end = child.end_byte(),
                "base_list" => base_list = Some(child),
                _ => {}
            }
        }

        if let Some(base_list) = base_list {
            let mut cursor = base_list.walk();
            decl.base_types = base_list
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "argument_list" && child.kind() != "comment")
                .map(|child| self.text(child).to_string())
                .collect();
        }

        let close_brace = {
            let mut cursor = body.walk();
            body.children(&mut cursor)
                .filter(|child| child.kind() == "}")
                .last()
                .map(|child| child.start_byte())
                .unwrap_or_else(|| body.end_byte().saturating_sub(1))
        };

        let mut entries: Vec<(usize, MemberKind, Option<CodeRange>, Option<Range<usize>>)> =
            Vec::new();
        let mut skip = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let kind = child.kind();
            if kind == "comment" {
                skip.push(child.byte_range());
                continue;
            }
            if kind.starts_with("preproc_") && kind != "preproc_if" {
                continue;
            }

            skip.push(child.byte_range());
            let (member, tail) = self.lower_member(child);
            entries.push((child.start_byte(), member, Some(range_for_node(child)), tail));
        }

        let inner = (body.start_byte() + 1).min(close_brace)..close_brace;
        for directive in directives::scan(&self.source, inner, &skip) {
            entries.push((
                directive.span.start,
                MemberKind::Region(directive.tag),
                Some(range_for_span(&self.source, directive.span.clone())),
                None,
            ));
        }
        entries.sort_by_key(|(start, ..)| *start);

        let class_indent = line_indent(&self.source, node.start_byte()).unwrap_or_default();
        let member_indent = entries
            .iter()
            .find(|(_, kind, ..)| !matches!(kind, MemberKind::Region(_)))
            .or(entries.first())
            .and_then(|(start, ..)| line_indent(&self.source, *start))
            .unwrap_or_else(|| format!("{class_indent}    "));

        let mut property_tails = BTreeMap::new();
        for (_, kind, range, tail) in entries {
            let id = decl.push(kind, range);
            if let Some(tail) = tail {
                property_tails.insert(id, tail);
            }
        }

        Some(ParsedClass {
            decl,
            layout: ClassLayout {
                body: body.byte_range(),
                close_brace,
                header_end,
                base_list_end: base_list.map(|node| node.end_byte()),
                class_indent,
                member_indent,
                property_tails,
            },
        })
    }

    fn lower_member(&self, node: Node<'_>) -> (MemberKind, Option<Range<usize>>) {
        match node.kind() {
            "property_declaration" => self.lower_property(node),
            "field_declaration" => (self.lower_field(node), None),
            "event_field_declaration" => {
                let (type_name, names, _) = self.variables(node);
                (MemberKind::EventField(EventFieldDecl { type_name, names }), None)
            }
            "method_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|name| self.text(name).to_string())
                    .unwrap_or_default();
                (MemberKind::Method(MethodDecl { name }), None)
            }
            other => (
                MemberKind::Other {
                    kind: other.to_string(),
                },
                None,
            ),
        }
    }

    fn lower_property(&self, node: Node<'_>) -> (MemberKind, Option<Range<usize>>) {
        let Some(accessor_list) = node.child_by_field_name("accessors") else {
            return (
                MemberKind::Other {
                    kind: "expression_bodied_property".to_string(),
                },
                None,
            );
        };
        if find_child_by_kind(node, "explicit_interface_specifier").is_some() {
            return (
                MemberKind::Other {
                    kind: "explicit_interface_property".to_string(),
                },
                None,
            );
        }

        let mut markers = Vec::new();
        let mut modifiers = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "attribute_list" => markers.extend(self.markers(child)),
                "modifier" => modifiers.push(self.text(child).to_string()),
                _ => {}
            }
        }

        let mut accessors = Vec::new();
        let mut cursor = accessor_list.walk();
        for accessor in accessor_list.named_children(&mut cursor) {
            if accessor.kind() != "accessor_declaration" {
                continue;
            }
            let kind = match accessor.child_by_field_name("name").map(|name| self.text(name)) {
                Some("get") => AccessorKind::Get,
                Some("set") => AccessorKind::Set,
                Some("init") => AccessorKind::Init,
                _ => continue,
            };

            let mut modifier_cursor = accessor.walk();
            let accessor_modifiers = accessor
                .children(&mut modifier_cursor)
                .filter(|child| child.kind() == "modifier")
                .map(|child| self.text(child))
                .collect::<Vec<_>>();

            accessors.push(Accessor {
                kind,
                visibility: Visibility::from_modifiers(&accessor_modifiers),
                has_body: accessor.child_by_field_name("body").is_some(),
            });
        }

        let property = PropertyDecl {
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(name).to_string())
                .unwrap_or_default(),
            type_name: node
                .child_by_field_name("type")
                .map(|type_node| self.text(type_node).to_string())
                .unwrap_or_default(),
            modifiers,
            markers,
            accessors,
            initializer: node
                .child_by_field_name("value")
                .map(|value| self.text(value).to_string()),
        };

        (
            MemberKind::Property(property),
            Some(accessor_list.start_byte()..node.end_byte()),
        )
    }

    fn lower_field(&self, node: Node<'_>) -> MemberKind {
        let mut cursor = node.walk();
        let modifiers = node
            .children(&mut cursor)
            .filter(|child| child.kind() == "modifier")
            .map(|child| self.text(child).to_string())
            .collect();
        let (type_name, names, initializer) = self.variables(node);

        MemberKind::Field(FieldDecl {
            type_name,
            names,
            modifiers,
            initializer,
        })
    }

    /// Type, declarator names and first initializer of a variable declaration.
    fn variables(&self, node: Node<'_>) -> (String, Vec<String>, Option<String>) {
        let Some(declaration) = find_child_by_kind(node, "variable_declaration") else {
            return (String::new(), Vec::new(), None);
        };

        let type_name = declaration
            .child_by_field_name("type")
            .map(|type_node| self.text(type_node).to_string())
            .unwrap_or_default();

        let mut names = Vec::new();
        let mut initializer = None;
        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            if let Some(name) = declarator.child_by_field_name("name") {
                names.push(self.text(name).to_string());
            }
            if initializer.is_none() {
                initializer = self.declarator_initializer(declarator);
            }
        }

        (type_name, names, initializer)
    }

    fn declarator_initializer(&self, declarator: Node<'_>) -> Option<String> {
        let mut cursor = declarator.walk();
        let mut seen_equals = false;
        for child in declarator.children(&mut cursor) {
            if seen_equals && child.is_named() {
                return Some(self.text(child).to_string());
            }
            if child.kind() == "=" {
                seen_equals = true;
            }
        }
        None
    }

    fn markers(&self, attribute_list: Node<'_>) -> Vec<MarkerUsage> {
        let mut markers = Vec::new();
        let mut cursor = attribute_list.walk();
        for attribute in attribute_list.named_children(&mut cursor) {
            if attribute.kind() != "attribute" {
                continue;
            }
            let Some(name) = attribute.child_by_field_name("name") else {
                continue;
            };

            let mut usage = MarkerUsage::new(self.text(name));
            usage.range = Some(range_for_node(attribute));

            if let Some(arguments) = find_child_by_kind(attribute, "attribute_argument_list") {
                let mut argument_cursor = arguments.walk();
                for argument in arguments.named_children(&mut argument_cursor) {
                    if argument.kind() == "attribute_argument" {
                        usage.arguments.push(self.argument(argument));
                    }
                }
            }

            markers.push(usage);
        }
        markers
    }

    fn argument(&self, node: Node<'_>) -> MarkerArgument {
        let mut cursor = node.walk();
        let children = node.children(&mut cursor).collect::<Vec<_>>();

        match children.as_slice() {
            [name, separator, value, ..]
                if name.kind() == "identifier" && matches!(separator.kind(), ":" | "=") =>
            {
                MarkerArgument::named(
                    self.text(*name),
                    ArgumentValue::from_source(self.text(*value)),
                )
            }
            _ => MarkerArgument::positional(ArgumentValue::from_source(self.text(node))),
        }
    }
}

fn collect_class_nodes<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_declaration" => out.push(child),
            "namespace_declaration" => {
                if let Some(body) = child.child_by_field_name("body") {
                    collect_class_nodes(body, out);
                }
            }
            _ => {}
        }
    }
}

/// Finds the first child node with the given kind.
fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

fn range_for_node(node: Node<'_>) -> CodeRange {
    let start = node.start_position();
    let end = node.end_position();

    CodeRange {
        start_line: start.row.saturating_add(1),
        start_column: start.column.saturating_add(1),
        end_line: end.row.saturating_add(1),
        end_column: end.column.saturating_add(1),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}

fn range_for_span(source: &str, span: Range<usize>) -> CodeRange {
    let (start_line, start_column) = position(source, span.start);
    let (end_line, end_column) = position(source, span.end);

    CodeRange {
        start_line,
        start_column,
        end_line,
        end_column,
        start_byte: span.start,
        end_byte: span.end,
    }
}

/// 1-based line and column of a byte offset.
fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}

/// Whitespace preceding `offset` on its line, when nothing else precedes it.
pub(crate) fn line_indent(source: &str, offset: usize) -> Option<String> {
    let before = source.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
    let prefix = &before[line_start..];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then(|| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::RegionTag;

    const SAMPLE: &str = r#"using System;

namespace Sample
{
    [Notify(NamingConvention.LeadingUnderscore, CompareMethod.ReferenceEquals)]
    public class MyClass : Base, IDisposable
    {
        // a comment
        public int MyProperty { get; set; } = 5;

        [NonNotify]
        public string Name { get; private set; }

        public int Computed => 42;

        private int counter, other = 3;

        public event EventHandler Changed;

        #region Helpers
        public void Dispose() { }
        #endregion
    }
}
"#;

    fn parse(source: &str) -> SourceFile {
        SourceFile::parse("Sample.cs", source).unwrap()
    }

    #[test]
    fn lowers_class_header() {
        let file = parse(SAMPLE);
        let classes = file.classes();
        assert_eq!(classes.len(), 1);

        let class = &classes[0].decl;
        assert_eq!(class.name, "MyClass");
        assert_eq!(class.base_types, vec!["Base", "IDisposable"]);
        assert_eq!(class.markers.len(), 1);
        assert_eq!(class.markers[0].name, "Notify");
        assert_eq!(
            class.markers[0].arguments[1].value,
            ArgumentValue::Enumerant {
                qualifier: Some("CompareMethod".into()),
                name: "ReferenceEquals".into(),
            }
        );
        assert_eq!(class.range.map(|range| range.start_line), Some(5));
    }

    #[test]
    fn lowers_members_in_order_with_region_tags() {
        let file = parse(SAMPLE);
        let class = &file.classes()[0].decl;

        let kinds = class
            .members
            .iter()
            .map(|member| match &member.kind {
                MemberKind::Property(property) => format!("property {}", property.name),
                MemberKind::Field(field) => format!("field {}", field.names.join(",")),
                MemberKind::EventField(event) => format!("event {}", event.names.join(",")),
                MemberKind::Method(method) => format!("method {}", method.name),
                MemberKind::Region(RegionTag::Start { name }) => format!("region {name}"),
                MemberKind::Region(RegionTag::End) => "endregion".to_string(),
                MemberKind::Other { kind } => format!("other {kind}"),
            })
            .collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                "property MyProperty",
                "property Name",
                "other expression_bodied_property",
                "field counter,other",
                "event Changed",
                "region Helpers",
                "method Dispose",
                "endregion",
            ]
        );
    }

    #[test]
    fn lowers_property_details() {
        let file = parse(SAMPLE);
        let parsed = &file.classes()[0];
        let (member, property) = parsed.decl.properties().next().unwrap();

        assert_eq!(property.type_name, "int");
        assert_eq!(property.modifiers, vec!["public"]);
        assert_eq!(property.initializer.as_deref(), Some("5"));
        assert!(property.getter().is_some());
        assert!(property.setter().is_some_and(|setter| !setter.has_body));

        let tail = parsed.layout.property_tails[&member.id].clone();
        assert_eq!(&file.source()[tail], "{ get; set; } = 5;");

        let (_, name) = parsed.decl.properties().nth(1).unwrap();
        assert_eq!(name.markers[0].name, "NonNotify");
        assert_eq!(
            name.setter().and_then(|setter| setter.visibility),
            Some(Visibility::Private)
        );
    }

    #[test]
    fn field_initializer_comes_from_first_declarator_with_one() {
        let file = parse(SAMPLE);
        let class = &file.classes()[0].decl;
        let field = class
            .members
            .iter()
            .find_map(|member| match &member.kind {
                MemberKind::Field(field) => Some(field),
                _ => None,
            })
            .unwrap();
        assert_eq!(field.initializer.as_deref(), Some("3"));
        assert_eq!(field.modifiers, vec!["private"]);
    }

    #[test]
    fn layout_records_indent_and_base_list() {
        let file = parse(SAMPLE);
        let layout = &file.classes()[0].layout;
        assert_eq!(layout.class_indent, "    ");
        assert_eq!(layout.member_indent, "        ");
        assert!(layout.base_list_end.is_some());
        assert_eq!(&file.source()[layout.close_brace..layout.close_brace + 1], "}");
    }

    #[test]
    fn named_marker_arguments() {
        let file = parse(
            "class A { [Notify(namingConvention: \"TrailingUnderscore\")] public int X { get; set; } }",
        );
        let class = &file.classes()[0].decl;
        let (_, property) = class.properties().next().unwrap();
        assert_eq!(
            property.markers[0].arguments,
            vec![MarkerArgument::named(
                "namingConvention",
                ArgumentValue::Text("TrailingUnderscore".into())
            )]
        );
    }

    #[test]
    fn file_scoped_namespace_and_usings() {
        let file = parse(
            "using System;\nusing System.ComponentModel;\nnamespace Demo;\n\npublic class A { }\n",
        );
        assert_eq!(file.classes().len(), 1);
        assert!(file.imports_namespace("System.ComponentModel"));
        assert!(!file.imports_namespace("System.Linq"));
        assert_eq!(
            file.last_top_level_using(),
            Some("using System;\nusing System.ComponentModel;".len())
        );
    }

    #[test]
    fn alias_and_static_usings_do_not_count() {
        let file = parse(
            "using CM = System.ComponentModel;\nusing static System.ComponentModel;\nclass A { }\n",
        );
        assert!(!file.imports_namespace("System.ComponentModel"));
    }

    #[test]
    fn nested_classes_are_not_lowered() {
        let file = parse("class Outer { class Inner { } }");
        let classes = file.classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(
            classes[0].decl.members[0].kind,
            MemberKind::Other {
                kind: "class_declaration".into()
            }
        );
    }

    #[test]
    fn open_rejects_other_extensions() {
        let error = SourceFile::open("notes.txt").unwrap_err();
        assert!(matches!(error, NotifyGenError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn position_is_one_based() {
        assert_eq!(position("ab\ncd", 0), (1, 1));
        assert_eq!(position("ab\ncd", 4), (2, 2));
    }
}
