use crate::conventions::ATTRIBUTE_SUFFIX;
use crate::marker::{MarkerType, NameResolver, SymbolResolver};
use crate::syntax::MarkerUsage;

use super::SourceFile;

/// Symbol resolution over a set of parsed C# files.
///
/// Marker usages resolve by name form. Attribute classes declared in the
/// added files contribute their base lists, which is where capability tags
/// such as `ILeadingUnderscoreNamingConvention` are found.
#[derive(Debug, Clone, Default)]
pub struct SourceSymbols {
    names: NameResolver,
}

impl SourceSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols declared in a single file.
    pub fn from_file(file: &SourceFile) -> Self {
        let mut symbols = Self::new();
        symbols.add_file(file);
        symbols
    }

    /// Registers the attribute classes declared in `file`.
    pub fn add_file(&mut self, file: &SourceFile) {
        for class in file.classes() {
            let decl = class.decl;
            if !decl.name.ends_with(ATTRIBUTE_SUFFIX) {
                continue;
            }
            tracing::trace!(
                file = %file.file.display(),
                marker = %decl.name,
                interfaces = decl.base_types.len(),
                "registered marker type"
            );
            self.names.register(&decl.name, decl.base_types);
        }
    }
}

impl SymbolResolver for SourceSymbols {
    fn resolve_marker(&self, usage: &MarkerUsage) -> Option<MarkerType> {
        self.names.resolve_marker(usage)
    }

    fn implemented_interfaces(&self, marker: &MarkerType) -> Vec<String> {
        self.names.implemented_interfaces(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_classes_contribute_interfaces() {
        let file = SourceFile::parse(
            "Annotations.cs",
            r#"
namespace Annotations
{
    public class NotifyAttribute : System.Attribute, ILeadingUnderscoreNamingConvention { }
    public class Helper : IDisposable { }
}
"#,
        )
        .unwrap();

        let symbols = SourceSymbols::from_file(&file);
        let marker = symbols
            .resolve_marker(&MarkerUsage::new("Annotations.Notify"))
            .unwrap();
        assert_eq!(marker, MarkerType::new("NotifyAttribute"));
        assert_eq!(
            symbols.implemented_interfaces(&marker),
            vec!["System.Attribute", "ILeadingUnderscoreNamingConvention"]
        );
        assert!(
            symbols
                .implemented_interfaces(&MarkerType::new("HelperAttribute"))
                .is_empty()
        );
    }

    #[test]
    fn unknown_markers_still_resolve_by_name() {
        let symbols = SourceSymbols::new();
        assert_eq!(
            symbols.resolve_marker(&MarkerUsage::new("NonNotify")),
            Some(MarkerType::new("NonNotifyAttribute"))
        );
    }
}
