//! C# host: tree-sitter parsing into the [`crate::syntax`] model, symbol
//! resolution over parsed files, and text rewriting of analysed plans.

mod directives;
pub mod rewrite;
mod source_file;
mod symbols;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::analyzer::{Analysis, Diagnostic, Generator};
use crate::error::NotifyGenError;
use crate::marker::SymbolResolver;
use crate::staleness::StaleReason;

pub use source_file::{ClassLayout, EXTENSION, ParsedClass, SourceFile};
pub use symbols::SourceSymbols;

/// Status of one generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    UpToDate,
    NeedsRegeneration,
}

/// Analysis summary of one generation target in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class: String,
    /// 1-based line of the class declaration.
    pub line: usize,
    pub selected: Vec<String>,
    pub status: ClassStatus,
    pub reason: Option<StaleReason>,
    pub diagnostic: Option<Diagnostic>,
}

/// Analysis of one file; classes that are not generation targets are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub classes: Vec<ClassReport>,
    /// The regenerated source, when any class needed regeneration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten: Option<String>,
}

impl FileReport {
    pub fn needs_regeneration(&self) -> bool {
        self.classes
            .iter()
            .any(|class| class.status == ClassStatus::NeedsRegeneration)
    }
}

fn class_report(parsed: &ParsedClass, analysis: &Analysis) -> Option<ClassReport> {
    let (resolution, status) = match analysis {
        Analysis::NotATarget => return None,
        Analysis::UpToDate { resolution } => (resolution, ClassStatus::UpToDate),
        Analysis::Regenerate { resolution, .. } => (resolution, ClassStatus::NeedsRegeneration),
    };

    Some(ClassReport {
        class: parsed.decl.name.clone(),
        line: parsed.decl.range.map_or(0, |range| range.start_line),
        selected: resolution
            .selected
            .iter()
            .map(|selected| selected.marker.property_name.clone())
            .collect(),
        status,
        reason: analysis.reason().cloned(),
        diagnostic: Diagnostic::for_analysis(&parsed.decl, analysis),
    })
}

/// Analyses every class of `file` without rewriting.
pub fn check<R: SymbolResolver + ?Sized>(
    file: &SourceFile,
    generator: &Generator,
    symbols: &R,
) -> FileReport {
    let classes = file
        .classes()
        .iter()
        .filter_map(|parsed| class_report(parsed, &generator.analyze(&parsed.decl, symbols)))
        .collect();

    FileReport {
        file: file.file.clone(),
        classes,
        rewritten: None,
    }
}

/// Analyses `file` with symbols from the file itself and regenerates it.
///
/// ## Errors
/// Returns an error if the computed edits overlap.
pub fn regenerate(file: &SourceFile, generator: &Generator) -> Result<FileReport, NotifyGenError> {
    let symbols = SourceSymbols::from_file(file);
    regenerate_with(file, generator, &symbols)
}

/// Analyses `file` and, when any class is stale, rewrites its source.
///
/// Files with syntax errors are analysed but never rewritten.
///
/// ## Errors
/// Returns an error if the computed edits overlap.
#[instrument(skip_all, fields(file = %file.file.display()))]
pub fn regenerate_with<R: SymbolResolver + ?Sized>(
    file: &SourceFile,
    generator: &Generator,
    symbols: &R,
) -> Result<FileReport, NotifyGenError> {
    let mut classes = Vec::new();
    let mut edits = Vec::new();

    for parsed in file.classes() {
        let analysis = generator.analyze(&parsed.decl, symbols);
        if let Some(plan) = analysis.plan() {
            edits.extend(rewrite::class_edits(file.source(), &parsed, plan));
        }
        classes.extend(class_report(&parsed, &analysis));
    }

    let mut report = FileReport {
        file: file.file.clone(),
        classes,
        rewritten: None,
    };

    if edits.is_empty() {
        return Ok(report);
    }

    if file.has_syntax_errors() {
        warn!("source has syntax errors, not rewriting");
        return Ok(report);
    }

    edits.extend(rewrite::using_edit(file));
    debug!(edits = edits.len(), "applying edits");
    let rewritten = rewrite::apply(file.source(), edits)?;
    if rewritten != file.source() {
        report.rewritten = Some(rewritten);
    }

    Ok(report)
}
