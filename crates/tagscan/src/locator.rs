//! resource declarations and their source snippets
//!
//! Every file is parsed twice:
//! - structurally with [hcl::parse], which yields the block tree tags are extracted from
//! - positionally with [hcl_edit::parser::parse_body], which keeps byte spans per block
//!
//! Both parses are correlated by `type.name`. A structural failure skips the whole file,
//! a positional failure only costs the line number (`0`) and the snippet (empty).
use crate::documents::SourceFile;
use hcl_edit::Span;
use indexmap::IndexMap;
use std::{collections::HashMap, ops::Range, path::PathBuf};

/// Snippets longer than this are cut at the last line break before it
pub const MAX_SNIPPET_BYTES: usize = 10 * 1024;

/// Appended to truncated snippets
pub const TRUNCATION_MARKER: &str = "\n# ... (truncated for display)";

/// A `resource "<type>" "<name>" { ... }` block found in a file
#[derive(Debug, Clone)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub name: String,
    pub file_path: PathBuf,
    /// 1-based declaration line, `0` when unknown
    pub line_number: usize,
    pub snippet: String,
    pub block: hcl::Block,
}

impl ResourceBlock {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error("unable to parse {}", path.display())]
    Structural {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },
}

/// Result of locating resources over a file list
#[derive(Debug, Default)]
pub struct Located {
    pub resources: Vec<ResourceBlock>,
    pub skipped: Vec<LocateError>,
}

/// Locates resources in every file, in the order given
pub fn locate(files: &[SourceFile]) -> Located {
    let mut located = Located::default();
    for file in files {
        match locate_file(file) {
            Ok(resources) => located.resources.extend(resources),
            Err(err) => {
                tracing::warn!(path=%file.path.display(), error=%err, "skipping file");
                located.skipped.push(err);
            }
        }
    }
    located
}

/// Locates resources of a single file in declaration order
///
/// A `type.name` declared twice in the same file keeps its first place in the order,
/// while position and contents come from the last declaration.
pub fn locate_file(file: &SourceFile) -> Result<Vec<ResourceBlock>, LocateError> {
    let body = hcl::parse(&file.contents).map_err(|source| LocateError::Structural {
        path: file.path.clone(),
        source,
    })?;

    let positions = block_positions(file);

    let mut resources = IndexMap::new();
    for block in body.blocks() {
        let Some((resource_type, name)) = resource_labels(block) else {
            continue;
        };
        let address = format!("{resource_type}.{name}");

        let (line_number, snippet) = match positions.as_ref().and_then(|p| p.get(&address)) {
            Some(span) => {
                let start_line = token_line(&file.contents, span.start);
                let end_line = line_of(&file.contents, span.end.saturating_sub(1));
                let snippet = extract_snippet(&file.contents, start_line, end_line);
                (start_line, snippet)
            }
            None => (0, String::new()),
        };

        if resources.contains_key(&address) {
            tracing::debug!(path=%file.path.display(), %address, "duplicate resource overwrites earlier declaration");
        }

        resources.insert(
            address,
            ResourceBlock {
                resource_type,
                name,
                file_path: file.path.clone(),
                line_number,
                snippet,
                block: block.clone(),
            },
        );
    }

    Ok(resources.into_values().collect())
}

fn resource_labels(block: &hcl::Block) -> Option<(String, String)> {
    if block.identifier.as_str() != "resource" {
        return None;
    }
    let [resource_type, name, ..] = block.labels.as_slice() else {
        return None;
    };
    Some((resource_type.as_str().to_string(), name.as_str().to_string()))
}

/// Byte span of every resource block, keyed by `type.name`
///
/// Returns `None` if the positional parse fails.
fn block_positions(file: &SourceFile) -> Option<HashMap<String, Range<usize>>> {
    let body = match hcl_edit::parser::parse_body(&file.contents) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(path=%file.path.display(), error=%err, "positional parse failed, snippets unavailable");
            return None;
        }
    };

    let mut positions = HashMap::new();
    for block in body.blocks() {
        if block.ident.value().as_str() != "resource" || block.labels.len() < 2 {
            continue;
        }
        let Some(span) = block.span() else {
            continue;
        };
        let address = format!("{}.{}", block.labels[0].as_str(), block.labels[1].as_str());
        positions.insert(address, span);
    }
    Some(positions)
}

/// 1-based line of the first token at or after `offset`
///
/// Whitespace and comments in front of the token are skipped.
pub fn token_line(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    loop {
        let rest = &source[offset..];
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();

        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            offset += trimmed.find('\n').unwrap_or(trimmed.len());
        } else if let Some(comment) = trimmed.strip_prefix("/*") {
            offset += comment.find("*/").map_or(trimmed.len(), |end| end + 4);
        } else {
            return line_of(source, offset);
        }
    }
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// Reconstructs the source text of a block declared on `start_line`
///
/// Braces are counted from the first `{` on; the snippet ends on the line where the
/// count returns to zero. Braces in string literals and comments are not counted.
/// Without a balanced closing brace the snippet runs to `fallback_end_line`.
pub fn extract_snippet(source: &str, start_line: usize, fallback_end_line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if start_line == 0 || start_line > lines.len() {
        return String::new();
    }
    let start = start_line - 1;

    let mut counter = BraceCounter::default();
    let end = lines[start..]
        .iter()
        .position(|line| counter.feed(line))
        .map(|offset| start + offset)
        .unwrap_or_else(|| fallback_end_line.clamp(start_line, lines.len()) - 1);

    truncate_snippet(lines[start..=end].join("\n").trim())
}

/// Caps a snippet at [MAX_SNIPPET_BYTES], never cutting a line in half
pub fn truncate_snippet(snippet: &str) -> String {
    if snippet.len() <= MAX_SNIPPET_BYTES {
        return snippet.to_string();
    }

    match snippet.as_bytes()[..=MAX_SNIPPET_BYTES]
        .iter()
        .rposition(|b| *b == b'\n')
    {
        Some(cut) => format!("{}{TRUNCATION_MARKER}", &snippet[..cut]),
        None => TRUNCATION_MARKER.trim_start().to_string(),
    }
}

#[derive(Default)]
struct BraceCounter {
    depth: usize,
    opened: bool,
    in_block_comment: bool,
}

impl BraceCounter {
    /// Feeds one line, returns `true` once the outermost brace is closed
    fn feed(&mut self, line: &str) -> bool {
        let mut chars = line.chars().peekable();
        let mut in_string = false;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if in_string {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '#' => break,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => {
                    self.depth += 1;
                    self.opened = true;
                }
                '}' if self.opened => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}
