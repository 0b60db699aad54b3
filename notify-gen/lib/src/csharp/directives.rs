//! `#region` / `#endregion` directive scanning.
//!
//! Region directives are preprocessor trivia, not declarations, so they are
//! recovered by scanning the lines of a class body:
//! - `#region Name` opens a region called `Name`
//! - `#endregion` closes the innermost open region
//!
//! Lines that fall inside a member or a comment are ignored.

use std::ops::Range;

use crate::syntax::RegionTag;

/// One region directive found in a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDirective {
    pub tag: RegionTag,
    /// Bytes of the directive text, from `#` to the end of the line (newline
    /// excluded).
    pub span: Range<usize>,
}

/// Parses a single line as a region directive.
pub fn parse_line(line: &str) -> Option<RegionTag> {
    let rest = line.trim().strip_prefix('#')?.trim_start();

    if keyword(rest, "endregion").is_some() {
        return Some(RegionTag::End);
    }

    keyword(rest, "region").map(|name| RegionTag::Start {
        name: name.trim().to_string(),
    })
}

fn keyword<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Scans `source[body]` for region directives.
///
/// `skip` lists byte ranges (members, comments) whose lines never hold a
/// directive; a line is skipped when its first non-blank byte lies in one.
pub fn scan(source: &str, body: Range<usize>, skip: &[Range<usize>]) -> Vec<RegionDirective> {
    let mut directives = Vec::new();
    let Some(text) = source.get(body.clone()) else {
        return directives;
    };

    let mut offset = body.start;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);
        let leading = content.len() - content.trim_start().len();
        let directive_start = line_start + leading;

        if skip.iter().any(|range| range.contains(&directive_start)) {
            continue;
        }

        if let Some(tag) = parse_line(content) {
            directives.push(RegionDirective {
                tag,
                span: directive_start..line_start + content.trim_end().len(),
            });
        }
    }

    directives
}
