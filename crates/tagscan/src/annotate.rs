//! resolved values next to the expressions of a snippet
//!
//! Every line of a snippet is scanned for `merge(...)` calls, `${...}` interpolations
//! and bare `var.*`/`local.*` references outside of plain string text. Each one that
//! resolves is listed below the snippet, grouped by line:
//! ```text
//! resource "aws_instance" "web" {
//!   tags = merge(local.common, { Name = "${var.env}-web" })
//! }
//!
//! ── Variable Resolutions ──
//!
//!   merge(local.common, { Name = "${var.env}-web" })  →  { Owner = "team-a", Name = "prod-web" }
//! ```
//! The annotated text is for people only, nothing reads it back.
use crate::{
    symbols::{ResolutionSource, SymbolTable},
    value::Value,
};
use regex::Regex;
use serde::Serialize;
use std::{collections::BTreeMap, ops::Range, sync::LazyLock};

/// Separator between a snippet and its resolutions
pub const RESOLUTIONS_HEADER: &str = "── Variable Resolutions ──";

/// A resolved expression found on a snippet line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineResolution {
    /// 1-based line within the snippet
    pub line: usize,
    pub original: String,
    pub resolved: Value,
    pub source: ResolutionSource,
}

static INTERPOLATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]+\}").expect("interpolation pattern is valid"));

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:var|local)\.[A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z_][A-Za-z0-9_-]*|\[[^\]]+\])*")
        .expect("reference pattern is valid")
});

static MERGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmerge\(").expect("merge pattern is valid"));

/// Resolves every expression of interest in `snippet`
///
/// Only expressions that resolve completely are returned. A multi-line `merge(...)` is
/// not resolved as a whole, its references are picked up line by line instead.
pub fn collect_resolutions(snippet: &str, symbols: &SymbolTable) -> Vec<LineResolution> {
    let mut resolutions = vec![];

    for (index, line) in snippet.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }

        let mut covered = literal_text(line);
        let mut candidates: Vec<(usize, &str)> = vec![];

        for found in MERGE_REGEX.find_iter(line) {
            if covered.iter().any(|range| range.contains(&found.start())) {
                continue;
            }
            if let Some(end) = closing_paren(line, found.end()) {
                covered.push(found.start()..end);
                candidates.push((found.start(), &line[found.start()..end]));
            }
        }

        for found in INTERPOLATION_REGEX.find_iter(line) {
            if covered.iter().any(|range| range.contains(&found.start())) {
                continue;
            }
            covered.push(found.range());
            candidates.push((found.start(), found.as_str()));
        }

        for found in REFERENCE_REGEX.find_iter(line) {
            if covered.iter().any(|range| range.contains(&found.start())) {
                continue;
            }
            candidates.push((found.start(), found.as_str()));
        }

        candidates.sort_by_key(|(start, _)| *start);

        let mut seen: Vec<&str> = vec![];
        for (_, expression) in candidates {
            if seen.contains(&expression) {
                continue;
            }
            seen.push(expression);

            let result = symbols.resolve_reference(expression);
            if !result.resolved {
                tracing::trace!(line = index + 1, %expression, reason = ?result.uncertainty, "not annotated");
                continue;
            }
            resolutions.push(LineResolution {
                line: index + 1,
                original: result.original,
                resolved: result.value,
                source: result.source,
            });
        }
    }

    resolutions
}

enum Frame {
    Text,
    /// open braces within an interpolation
    Code(usize),
}

/// Byte ranges of plain text in quoted strings, `${...}` parts excluded
fn literal_text(line: &str) -> Vec<Range<usize>> {
    let mut ranges = vec![];
    let mut frames: Vec<Frame> = vec![];
    let mut start = 0;
    let mut escaped = false;
    let mut chars = line.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match frames.last_mut() {
            Some(Frame::Text) => match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    ranges.push(start..offset);
                    frames.pop();
                }
                '$' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                    ranges.push(start..offset);
                    chars.next();
                    frames.push(Frame::Code(0));
                }
                _ => {}
            },
            code => match c {
                '"' => {
                    frames.push(Frame::Text);
                    start = offset + 1;
                }
                '{' => {
                    if let Some(Frame::Code(depth)) = code {
                        *depth += 1;
                    }
                }
                '}' => match code {
                    Some(Frame::Code(0)) => {
                        frames.pop();
                        start = offset + 1;
                    }
                    Some(Frame::Code(depth)) => *depth -= 1,
                    _ => {}
                },
                _ => {}
            },
        }
    }
    if matches!(frames.last(), Some(Frame::Text)) {
        ranges.push(start..line.len());
    }
    ranges
}

/// Byte offset just past the `)` closing the call opened before `start`
fn closing_paren(line: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in line[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Appends `resolutions` to `snippet`, grouped by line
///
/// Without resolutions the snippet is returned as is.
pub fn annotate(snippet: &str, resolutions: &[LineResolution]) -> String {
    if resolutions.is_empty() {
        return snippet.to_string();
    }

    let mut by_line: BTreeMap<usize, Vec<&LineResolution>> = BTreeMap::new();
    for resolution in resolutions {
        by_line.entry(resolution.line).or_default().push(resolution);
    }

    let mut out = String::from(snippet);
    out.push_str("\n\n");
    out.push_str(RESOLUTIONS_HEADER);
    out.push('\n');
    for group in by_line.values() {
        out.push('\n');
        for resolution in group {
            out.push_str(&format!(
                "  {}  →  {}\n",
                resolution.original, resolution.resolved
            ));
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// [collect_resolutions] followed by [annotate]
pub fn annotate_snippet(snippet: &str, symbols: &SymbolTable) -> String {
    annotate(snippet, &collect_resolutions(snippet, symbols))
}
