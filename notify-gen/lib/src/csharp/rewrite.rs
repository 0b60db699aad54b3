//! Applies edit plans to C# source text.
//!
//! Every plan becomes a set of byte-range edits: removed members disappear
//! with their whole lines, rewritten properties get new accessor lists, the
//! generated region is inserted before the class's closing brace, and the
//! interface joins the base list. Edits are applied back to front so earlier
//! offsets stay valid.

use std::ops::Range;

use crate::conventions::COMPONENT_MODEL_NAMESPACE;
use crate::emit;
use crate::error::NotifyGenError;
use crate::plan::EditPlan;
use crate::region;

use super::source_file::{ParsedClass, SourceFile};

/// A replacement of `range` by `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
    /// Class the edit belongs to, for error reporting.
    pub owner: String,
}

impl TextEdit {
    fn new(range: Range<usize>, replacement: impl Into<String>, owner: &str) -> Self {
        Self {
            range,
            replacement: replacement.into(),
            owner: owner.to_string(),
        }
    }
}

/// Line ending used by the source (`\r\n` when any line uses it).
pub fn newline_style(source: &str) -> &'static str {
    if source.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Builds the edits that apply `plan` to one class.
pub fn class_edits(source: &str, parsed: &ParsedClass, plan: &EditPlan) -> Vec<TextEdit> {
    let newline = newline_style(source);
    let owner = parsed.decl.name.as_str();
    let layout = &parsed.layout;
    let mut edits = Vec::new();

    // Removals: the old region as one block when nothing inside it survives.
    let mut removals: Vec<Range<usize>> = Vec::new();
    let mut handled = Vec::new();
    if let Some(generated) = region::locate(&parsed.decl) {
        let span = generated.members(&parsed.decl);
        let all_removed = span.iter().all(|member| plan.removes(member.id));
        if all_removed
            && let (Some(first), Some(last)) = (
                span.first().and_then(|member| member.range),
                span.last().and_then(|member| member.range),
            )
        {
            let start = extend_over_blank_lines(source, line_start(source, first.start_byte));
            removals.push(start..line_end(source, last.end_byte));
            handled.extend(span.iter().map(|member| member.id));
        }
    }
    for member in &parsed.decl.members {
        if !plan.removes(member.id) || handled.contains(&member.id) {
            continue;
        }
        if let Some(range) = member.range {
            removals.push(whole_lines(source, range.start_byte..range.end_byte));
        }
    }

    for rewrite in &plan.members_to_rewrite {
        if let Some(tail) = layout.property_tails.get(&rewrite.member) {
            edits.push(TextEdit::new(
                tail.clone(),
                emit::render_accessors(&rewrite.replacement),
                owner,
            ));
        }
    }

    let insert_at = content_end(source, layout.close_brace, layout.body.start + 1, &removals);
    let region_text = emit::render_region(plan, &layout.member_indent, newline);
    let mut region_edit = format!("{newline}{newline}{region_text}");
    if let Some(gap) = brace_gap(source, insert_at, layout.close_brace) {
        // `#endregion` must not share its line with the closing brace.
        if !gap.is_empty() {
            edits.push(TextEdit::new(gap, "", owner));
        }
        region_edit.push_str(newline);
        region_edit.push_str(&layout.class_indent);
    }
    edits.push(TextEdit::new(insert_at..insert_at, region_edit, owner));

    if let Some(interface) = &plan.interface_to_ensure {
        let edit = match layout.base_list_end {
            Some(end) => TextEdit::new(end..end, format!(", {interface}"), owner),
            None => TextEdit::new(
                layout.header_end..layout.header_end,
                format!(" : {interface}"),
                owner,
            ),
        };
        edits.push(edit);
    }

    edits.extend(
        removals
            .into_iter()
            .map(|range| TextEdit::new(range, "", owner)),
    );

    edits
}

/// Builds the edit adding `using System.ComponentModel;`, if missing.
pub fn using_edit(file: &SourceFile) -> Option<TextEdit> {
    if file.imports_namespace(COMPONENT_MODEL_NAMESPACE) {
        return None;
    }

    let newline = newline_style(file.source());
    let directive = format!("using {COMPONENT_MODEL_NAMESPACE};");
    let edit = match file.last_top_level_using() {
        Some(end) => TextEdit::new(end..end, format!("{newline}{directive}"), "using"),
        None => TextEdit::new(0..0, format!("{directive}{newline}{newline}"), "using"),
    };
    Some(edit)
}

/// Applies edits to `source`.
///
/// ## Errors
/// Returns [`NotifyGenError::OverlappingEdits`] when two edits touch the same
/// bytes.
pub fn apply(source: &str, mut edits: Vec<TextEdit>) -> Result<String, NotifyGenError> {
    edits.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(a.range.end.cmp(&b.range.end))
    });

    for pair in edits.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let touches = next.range.start < previous.range.end
            || (next.range.start == previous.range.start
                && previous.range.is_empty()
                && next.range.is_empty());
        if touches {
            return Err(NotifyGenError::OverlappingEdits {
                class: next.owner.clone(),
                offset: next.range.start,
            });
        }
    }

    let mut output = source.to_string();
    for edit in edits.iter().rev() {
        output.replace_range(edit.range.clone(), &edit.replacement);
    }
    Ok(output)
}

fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |newline| newline + 1)
}

/// Offset just past the newline ending the line that contains `offset`.
fn line_end(source: &str, offset: usize) -> usize {
    source[offset..]
        .find('\n')
        .map_or(source.len(), |newline| offset + newline + 1)
}

/// Widens `range` to whole lines when it shares its lines with nothing else.
fn whole_lines(source: &str, range: Range<usize>) -> Range<usize> {
    let start = line_start(source, range.start);
    let end = line_end(source, range.end);

    let before_blank = source[start..range.start].trim().is_empty();
    let after_blank = source[range.end..end].trim().is_empty();

    match (before_blank, after_blank) {
        (true, true) => start..end,
        _ => range,
    }
}

/// Moves a line-start offset back over preceding blank lines.
fn extend_over_blank_lines(source: &str, mut start: usize) -> usize {
    while start > 0 {
        let previous = line_start(source, start - 1);
        if !source[previous..start].trim().is_empty() {
            break;
        }
        start = previous;
    }
    start
}

/// Last offset before `close_brace` that is neither whitespace nor removed.
fn content_end(source: &str, close_brace: usize, floor: usize, removals: &[Range<usize>]) -> usize {
    let bytes = source.as_bytes();
    let mut position = close_brace;

    while position > floor {
        if let Some(removed) = removals
            .iter()
            .find(|range| range.start < position && position <= range.end)
        {
            position = removed.start.max(floor);
            continue;
        }
        if bytes[position - 1].is_ascii_whitespace() {
            position -= 1;
            continue;
        }
        break;
    }

    position
}

/// Spaces and tabs before `close_brace`, when the brace sits on the same line
/// as `insert_at`.
fn brace_gap(source: &str, insert_at: usize, close_brace: usize) -> Option<Range<usize>> {
    if source[insert_at..close_brace].contains('\n') {
        return None;
    }
    let gap_start = source[..close_brace]
        .trim_end_matches([' ', '\t'])
        .len()
        .max(insert_at);
    Some(gap_start..close_brace)
}
