//! Image specification loader
//!
//! Turns specification text into directives in document order:
//!
//! ```toml
//! [[mkdir]]
//! path = "/srv"
//!
//! [[run]]
//! script = "echo hello > /srv/greeting"
//! [run.env]
//! LANG = "C"
//! ```
//!
//! Every top-level table header starts a directive named by its tag. Nested
//! headers belong to the directive they follow. Nothing is executed here.

use std::collections::HashMap;
use std::fmt;

use crate::core::directive::{Directive, DirectiveRegistry};
use crate::core::source_map::{Header, SourceMap};
use crate::error::{Location, SpecfileError};

/// Label used for locations in loaded text
const ORIGIN: &str = "<specification>";

/// A directive with its half-open source line range
pub struct LoadedDirective {
    /// First line, the table header
    pub start_line: usize,
    /// One past the last content line
    pub end_line: usize,
    /// The directive itself
    pub directive: Box<dyn Directive>,
}

impl fmt::Debug for LoadedDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedDirective")
            .field("kind", &self.directive.kind())
            .field("start_line", &self.start_line)
            .field("end_line", &self.end_line)
            .finish()
    }
}

impl LoadedDirective {
    /// Kind of the wrapped directive
    pub fn kind(&self) -> &'static str {
        self.directive.kind()
    }
}

/// Parse `text` into directives using `registry`
pub fn load(text: &str, registry: &DirectiveRegistry) -> Result<Vec<LoadedDirective>, SpecfileError> {
    let map = SourceMap::new(text);

    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| {
        let (line, column) = e.span().map_or((1, 1), |span| map.position(span.start));
        SpecfileError::Syntax {
            location: Location::new(ORIGIN, line, column),
            message: e.message().to_string(),
        }
    })?;

    if let Some((key, line)) = map.top_level_keys().first() {
        return Err(SpecfileError::UnexpectedEntry {
            key: key.clone(),
            line: *line,
        });
    }

    let starts = directive_headers(&map)?;
    check_directive_counts(&table, &starts)?;
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut directives = Vec::with_capacity(starts.len());

    for (i, header) in starts.iter().enumerate() {
        let tag = header.keys[0].as_str();
        let index = seen.entry(tag).or_insert(0);
        let body = directive_body(&table, tag, header.array, *index);
        *index += 1;

        let body = body.ok_or_else(|| SpecfileError::InvalidDirective {
            tag: tag.to_string(),
            line: header.line,
            message: "directive must be a table".to_string(),
        })?;

        let next = starts
            .get(i + 1)
            .map_or(map.line_count() + 1, |h| h.line);
        let end_line = content_end(&map, header.line, next);

        let directive = registry
            .build(tag, body)
            .ok_or_else(|| SpecfileError::UnknownDirective {
                tag: tag.to_string(),
                line: header.line,
            })?
            .map_err(|message| SpecfileError::InvalidDirective {
                tag: tag.to_string(),
                line: header.line,
                message,
            })?;

        tracing::debug!(
            "loaded {} directive from line {} to {}",
            directive.kind(),
            header.line,
            end_line
        );
        directives.push(LoadedDirective {
            start_line: header.line,
            end_line,
            directive,
        });
    }

    Ok(directives)
}

/// Top-level headers, checking that every nested header follows its directive
fn directive_headers(map: &SourceMap) -> Result<Vec<&Header>, SpecfileError> {
    let mut starts: Vec<&Header> = Vec::new();

    for header in map.headers() {
        if header.keys.len() == 1 {
            starts.push(header);
            continue;
        }
        let owner = starts.last().map(|h| h.keys[0].as_str());
        if owner != Some(header.keys[0].as_str()) {
            return Err(SpecfileError::UnexpectedEntry {
                key: header.keys.join("."),
                line: header.line,
            });
        }
    }

    Ok(starts)
}

/// Every body in `table` must have been found as a header in the text
fn check_directive_counts(table: &toml::Table, starts: &[&Header]) -> Result<(), SpecfileError> {
    let mut headers: HashMap<&str, usize> = HashMap::new();
    for header in starts {
        *headers.entry(header.keys[0].as_str()).or_insert(0) += 1;
    }

    for (tag, value) in table {
        let bodies = value.as_array().map_or(1, Vec::len);
        let found = headers.get(tag.as_str()).copied().unwrap_or(0);
        if found != bodies {
            return Err(SpecfileError::DirectiveCount {
                tag: tag.clone(),
                headers: found,
                bodies,
            });
        }
    }

    Ok(())
}

fn directive_body<'t>(
    table: &'t toml::Table,
    tag: &str,
    array: bool,
    index: usize,
) -> Option<&'t toml::Table> {
    let value = table.get(tag)?;
    if array {
        value.as_array()?.get(index)?.as_table()
    } else {
        value.as_table()
    }
}

/// One past the last non-blank line in `[start, next)`
fn content_end(map: &SourceMap, start: usize, next: usize) -> usize {
    let mut end = next;
    while end - 1 > start && map.is_blank(end - 1) {
        end -= 1;
    }
    end
}
