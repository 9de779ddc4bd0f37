//! Source positions for TOML documents
//!
//! The `toml` parser gives byte spans for syntax errors only. To report
//! validation failures with line numbers we lex the raw text for table
//! headers (`[a.b]`, `[[a.b]]`) and top-level keys, and resolve each header
//! to the indexed path of the table it opens, e.g. `patchset[1].file[0]`.
//!
//! The lexer follows TOML quoting: basic strings with escapes, literal
//! strings, both multi-line forms, comments, arrays and inline tables. It only
//! runs on text the `toml` parser accepted, so it never reports errors.

use std::collections::HashMap;

/// A table header found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Dotted key segments, unquoted
    pub keys: Vec<String>,
    /// `[[...]]` rather than `[...]`
    pub array: bool,
    /// Indexed path of the opened table, e.g. `package[2].requires`
    pub path: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column of the opening bracket
    pub column: usize,
}

/// Line index and header table of one TOML text
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    line_starts: Vec<usize>,
    /// Per line: whether any key, value or header touches it
    content: Vec<bool>,
    headers: Vec<Header>,
    positions: HashMap<String, (usize, usize)>,
    top_level_keys: Vec<(String, usize)>,
}

impl SourceMap {
    /// Scan `text`
    pub fn new(text: &str) -> Self {
        let mut map = Self {
            line_starts: std::iter::once(0)
                .chain(text.match_indices('\n').map(|(i, _)| i + 1))
                .collect(),
            content: vec![false; text.lines().count()],
            ..Self::default()
        };
        map.scan(text);
        map
    }

    fn scan(&mut self, text: &str) {
        let mut lexer = Lexer::new(text);
        let mut current_index: HashMap<String, usize> = HashMap::new();
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut seen_header = false;

        loop {
            lexer.skip_trivia();
            let Some(byte) = lexer.peek() else {
                break;
            };
            let start = lexer.pos;
            let (line, column) = self.position(start);

            if byte == b'[' {
                let array = lexer.starts_with(b"[[");
                lexer.pos += if array { 2 } else { 1 };
                let keys = lexer.key();
                lexer.close_header(array);

                seen_header = true;
                let path = resolve_path(&keys, array, &mut current_index, &mut counters);
                self.positions.insert(path.clone(), (line, column));
                self.headers.push(Header {
                    keys,
                    array,
                    path,
                    line,
                    column,
                });
            } else {
                let keys = lexer.key();
                if lexer.peek() == Some(b'=') {
                    lexer.pos += 1;
                    lexer.value();
                }
                if !seen_header {
                    if let Some(first) = keys.into_iter().next().filter(|k| !k.is_empty()) {
                        self.top_level_keys.push((first, line));
                    }
                }
            }

            self.mark_content(start, lexer.pos);
            lexer.skip_inline_whitespace();
            lexer.skip_comment();
            if lexer.pos == start || !matches!(lexer.peek(), None | Some(b'\n')) {
                lexer.skip_line();
            }
        }
    }

    fn mark_content(&mut self, start: usize, end: usize) {
        let first = self.position(start).0;
        let last = self.position(end.saturating_sub(1).max(start)).0;
        for line in first..=last {
            if let Some(slot) = self.content.get_mut(line - 1) {
                *slot = true;
            }
        }
    }

    /// Convert a byte offset into a 1-based `(line, column)`
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset.saturating_sub(start) + 1)
    }

    /// Position of the header opening the table at `path`
    pub fn lookup(&self, path: &str) -> Option<(usize, usize)> {
        self.positions.get(path).copied()
    }

    /// All headers in document order
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Keys assigned before the first header, with their lines
    pub fn top_level_keys(&self) -> &[(String, usize)] {
        &self.top_level_keys
    }

    /// Number of lines in the text
    pub fn line_count(&self) -> usize {
        self.content.len()
    }

    /// Whether the 1-based line holds only whitespace or a comment
    pub fn is_blank(&self, line: usize) -> bool {
        line.checked_sub(1)
            .and_then(|i| self.content.get(i))
            .map_or(true, |content| !content)
    }
}

/// Join a parent path and a key
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Byte cursor over TOML text; every delimiter it looks for is ASCII
struct Lexer<'t> {
    bytes: &'t [u8],
    pos: usize,
}

impl<'t> Lexer<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(prefix))
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some(b'#') {
            while !matches!(self.peek(), None | Some(b'\n')) {
                self.pos += 1;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(byte) = self.peek() {
            self.pos += 1;
            if byte == b'\n' {
                break;
            }
        }
    }

    /// Whitespace, newlines and comments
    fn skip_trivia(&mut self) {
        loop {
            self.skip_inline_whitespace();
            match self.peek() {
                Some(b'\n') => self.pos += 1,
                Some(b'#') => self.skip_comment(),
                _ => break,
            }
        }
    }

    /// Dotted key, stopping at whatever follows it (`=`, `]`, ...)
    fn key(&mut self) -> Vec<String> {
        let mut keys = Vec::new();
        loop {
            self.skip_inline_whitespace();
            let segment = match self.peek() {
                Some(quote @ (b'"' | b'\'')) => self.quoted_key(quote),
                _ => {
                    let start = self.pos;
                    while self
                        .peek()
                        .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
                    {
                        self.pos += 1;
                    }
                    String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
                }
            };
            keys.push(segment);
            self.skip_inline_whitespace();
            if self.peek() == Some(b'.') {
                self.pos += 1;
            } else {
                return keys;
            }
        }
    }

    fn quoted_key(&mut self, quote: u8) -> String {
        self.pos += 1;
        let mut segment = Vec::new();
        while let Some(byte) = self.peek() {
            if byte == b'\n' {
                break;
            }
            self.pos += 1;
            if byte == quote {
                break;
            }
            if quote == b'"' && byte == b'\\' {
                if let Some(escaped) = self.peek() {
                    self.pos += 1;
                    segment.push(escaped);
                }
                continue;
            }
            segment.push(byte);
        }
        String::from_utf8_lossy(&segment).into_owned()
    }

    fn close_header(&mut self, array: bool) {
        for _ in 0..if array { 2 } else { 1 } {
            self.skip_inline_whitespace();
            if self.peek() == Some(b']') {
                self.pos += 1;
            }
        }
    }

    /// Skip one value of any type
    fn value(&mut self) {
        self.skip_inline_whitespace();
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.string(quote),
            Some(b'[') => self.array(),
            Some(b'{') => self.inline_table(),
            Some(_) => {
                while !matches!(
                    self.peek(),
                    None | Some(b' ' | b'\t' | b'\r' | b'\n' | b',' | b']' | b'}' | b'#')
                ) {
                    self.pos += 1;
                }
            }
            None => {}
        }
    }

    fn array(&mut self) {
        self.pos += 1;
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return,
                Some(b']') => {
                    self.pos += 1;
                    return;
                }
                Some(b',') => self.pos += 1,
                Some(_) => {
                    let start = self.pos;
                    self.value();
                    if self.pos == start {
                        self.pos += 1;
                    }
                }
            }
        }
    }

    fn inline_table(&mut self) {
        self.pos += 1;
        loop {
            self.skip_inline_whitespace();
            match self.peek() {
                None | Some(b'\n') => return,
                Some(b'}') => {
                    self.pos += 1;
                    return;
                }
                Some(b',') => self.pos += 1,
                Some(_) => {
                    let start = self.pos;
                    self.key();
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.value();
                    }
                    if self.pos == start {
                        self.pos += 1;
                    }
                }
            }
        }
    }

    fn string(&mut self, quote: u8) {
        let escapes = quote == b'"';
        let delimiter = [quote; 3];

        if self.starts_with(&delimiter) {
            self.pos += 3;
            while self.pos < self.bytes.len() {
                if escapes && self.peek() == Some(b'\\') {
                    self.pos += 2;
                    continue;
                }
                if self.starts_with(&delimiter) {
                    self.pos += 3;
                    // up to two more quotes belong to the body
                    for _ in 0..2 {
                        if self.peek() == Some(quote) {
                            self.pos += 1;
                        }
                    }
                    return;
                }
                self.pos += 1;
            }
            self.pos = self.bytes.len();
            return;
        }

        self.pos += 1;
        while let Some(byte) = self.peek() {
            if byte == b'\n' {
                return;
            }
            self.pos += 1;
            if escapes && byte == b'\\' {
                if self.peek().is_some_and(|b| b != b'\n') {
                    self.pos += 1;
                }
            } else if byte == quote {
                return;
            }
        }
    }
}

fn resolve_path(
    keys: &[String],
    array: bool,
    current_index: &mut HashMap<String, usize>,
    counters: &mut HashMap<String, usize>,
) -> String {
    let mut path = String::new();
    let last = keys.len().saturating_sub(1);

    for (i, key) in keys.iter().enumerate() {
        path = child_path(&path, key);
        if i < last {
            if let Some(index) = current_index.get(&path) {
                path = format!("{path}[{index}]");
            }
        } else if array {
            let counter = counters.entry(path.clone()).or_insert(0);
            let index = *counter;
            *counter += 1;
            current_index.insert(path.clone(), index);
            path = format!("{path}[{index}]");
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"title = "x"

[source]
name = "hello"

[[package]]
name = "hello"

  [[package.requires.package]]
  name = "libc"

[[package]]
name = "hello-doc"

[[package.requires.package]]
name = "hello"

[[patchset]]
strip = 1
notes = """
[not-a-header]
"""
[[patchset.file]]
src = "a.patch"
"#;

    fn header_lines(text: &str) -> Vec<usize> {
        SourceMap::new(text).headers().iter().map(|h| h.line).collect()
    }

    #[test]
    fn test_positions_from_offsets() {
        let map = SourceMap::new("ab\ncd\n");
        assert_eq!(map.position(0), (1, 1));
        assert_eq!(map.position(1), (1, 2));
        assert_eq!(map.position(3), (2, 1));
        assert_eq!(map.position(4), (2, 2));
    }

    #[test]
    fn test_headers_resolve_indexed_paths() {
        let map = SourceMap::new(SAMPLE);
        assert_eq!(map.lookup("source"), Some((3, 1)));
        assert_eq!(map.lookup("package[0]"), Some((6, 1)));
        assert_eq!(map.lookup("package[0].requires.package[0]"), Some((9, 3)));
        assert_eq!(map.lookup("package[1]"), Some((12, 1)));
        assert_eq!(map.lookup("package[1].requires.package[0]"), Some((15, 1)));
        assert_eq!(map.lookup("patchset[0].file[0]"), Some((23, 1)));
    }

    #[test]
    fn test_multiline_strings_are_not_headers() {
        let map = SourceMap::new(SAMPLE);
        assert!(map.headers().iter().all(|h| h.keys[0] != "not-a-header"));
    }

    #[test]
    fn test_top_level_keys() {
        let map = SourceMap::new(SAMPLE);
        assert_eq!(map.top_level_keys(), &[("title".to_string(), 1)]);
    }

    #[test]
    fn test_quoted_keys() {
        let map = SourceMap::new("[a.\"b.c\".d]\nx = 1\n[ a . 'e' ]\n");
        assert_eq!(map.headers()[0].keys, vec!["a", "b.c", "d"]);
        assert_eq!(map.headers()[1].keys, vec!["a", "e"]);
    }

    #[test]
    fn test_multiline_arrays_are_not_headers() {
        let text = "[[run]]\nargs = [\n  [\"a\"],\n  \"]\",\n]\n[[run]]\n";
        assert_eq!(header_lines(text), vec![1, 6]);
    }

    #[test]
    fn test_triple_quotes_inside_a_basic_string() {
        let text = r#"[[run]]
script = "echo '''"

[[mkdir]]
path = "/srv"

[[mkdir]]
path = "/opt"
"#;
        assert_eq!(header_lines(text), vec![1, 4, 7]);
    }

    #[test]
    fn test_escaped_quote_before_bracket() {
        let text = r#"[[run]]
script = "echo \"[\""
[[mkdir]]
path = "/srv"
"#;
        assert_eq!(header_lines(text), vec![1, 3]);
    }

    #[test]
    fn test_triple_quotes_inside_a_comment() {
        let text = r#"[[mkdir]]
path = "/a" # use """ for long scripts

[[mkdir]]
path = "/b"
"#;
        assert_eq!(header_lines(text), vec![1, 4]);
    }

    #[test]
    fn test_multiline_string_edges() {
        let text = r#"a = """
\""""""
[b]
c = '''x''''
[d]
"#;
        assert_eq!(header_lines(text), vec![3, 5]);
    }

    #[test]
    fn test_inline_tables_and_commented_arrays() {
        let text = r#"x = { y = "]", z = [1, "["] }
[a]
b = [
  # ]
  "[[c]]",
]
[[d]]
"#;
        assert_eq!(header_lines(text), vec![2, 7]);
        assert_eq!(SourceMap::new(text).top_level_keys(), &[("x".to_string(), 1)]);
    }

    #[test]
    fn test_blank_lines() {
        let map = SourceMap::new("a = 1\n\n# comment\nb = 2\n");
        assert!(!map.is_blank(1));
        assert!(map.is_blank(2));
        assert!(map.is_blank(3));
        assert!(!map.is_blank(4));
        assert!(map.is_blank(99));
        assert!(map.is_blank(0));
    }

    #[test]
    fn test_lines_inside_strings_are_content() {
        let map = SourceMap::new("s = \"\"\"\n# not a comment\n\n\"\"\"\n");
        assert!(!map.is_blank(2));
        assert!(!map.is_blank(3));
        assert_eq!(map.line_count(), 4);
    }
}
