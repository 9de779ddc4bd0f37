//! Element tree of a specification document
//!
//! A TOML document maps onto a tree of named elements: tables and arrays of
//! tables become child elements, scalar keys become attributes. The root
//! element is always named [`ROOT_ELEMENT`].
//!
//! A root-level `include = [...]` array splices the children of other
//! documents in at the position of the key. Paths are relative to the
//! including file.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::source_map::{child_path, SourceMap};
use crate::error::{Location, SpecfileError};

/// Name of the document root
pub const ROOT_ELEMENT: &str = "control";

/// Root-level key listing fragments to splice in
pub const INCLUDE_KEY: &str = "include";

/// Maximum nesting of included fragments
const MAX_INCLUDE_DEPTH: usize = 16;

/// A named node with attributes and ordered children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    name: String,
    attributes: BTreeMap<String, String>,
    children: Vec<Element>,
    #[serde(skip)]
    location: Location,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            location,
        }
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes, sorted by name
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Children in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Children with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Where the element was declared
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Visit the element and all descendants depth-first, passing the
    /// names of the ancestors of each visited element.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Element, &[&'a str]),
    {
        let mut ancestors = Vec::new();
        self.walk_inner(&mut ancestors, visit);
    }

    fn walk_inner<'a, F>(&'a self, ancestors: &mut Vec<&'a str>, visit: &mut F)
    where
        F: FnMut(&'a Element, &[&'a str]),
    {
        visit(self, ancestors);
        ancestors.push(&self.name);
        for child in &self.children {
            child.walk_inner(ancestors, visit);
        }
        ancestors.pop();
    }
}

/// Parse a specification file, resolving includes
pub fn parse_file(path: &Path) -> Result<Element, SpecfileError> {
    let mut stack = Vec::new();
    let children = parse_fragment(path, &mut stack)?;
    let mut root = Element::new(ROOT_ELEMENT, Location::new(file_label(path), 1, 1));
    root.children = children;
    Ok(root)
}

/// Parse specification text; includes resolve relative to `origin`'s directory
pub fn parse_str(text: &str, origin: &Path) -> Result<Element, SpecfileError> {
    let mut stack = vec![origin
        .canonicalize()
        .unwrap_or_else(|_| origin.to_path_buf())];
    let children = parse_text(text, origin, &mut stack)?;
    let mut root = Element::new(ROOT_ELEMENT, Location::new(file_label(origin), 1, 1));
    root.children = children;
    Ok(root)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn parse_fragment(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Vec<Element>, SpecfileError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| SpecfileError::Include {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if stack.contains(&canonical) {
        return Err(SpecfileError::Include {
            path: path.to_path_buf(),
            reason: "inclusion cycle".to_string(),
        });
    }
    if stack.len() >= MAX_INCLUDE_DEPTH {
        return Err(SpecfileError::Include {
            path: path.to_path_buf(),
            reason: format!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels"),
        });
    }

    let text = std::fs::read_to_string(&canonical).map_err(|e| SpecfileError::Include {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    stack.push(canonical);
    let children = parse_text(&text, path, stack);
    stack.pop();
    children
}

fn parse_text(
    text: &str,
    origin: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<Vec<Element>, SpecfileError> {
    let file = file_label(origin);
    let map = SourceMap::new(text);

    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| {
        let (line, column) = e
            .span()
            .map_or((1, 1), |span| map.position(span.start));
        SpecfileError::Syntax {
            location: Location::new(file.clone(), line, column),
            message: e.message().to_string(),
        }
    })?;

    let builder = TreeBuilder { file: &file, map: &map };
    let root_location = Location::new(file.clone(), 1, 1);

    // Root-level scalars have nowhere to live.
    if let Some((key, _)) = table
        .iter()
        .find(|(k, v)| k.as_str() != INCLUDE_KEY && !is_element_value(v))
    {
        return Err(builder.syntax(
            key,
            &root_location,
            "attributes are not allowed at the document root",
        ));
    }

    let mut children = Vec::new();

    for (key, value) in &table {
        if key == INCLUDE_KEY {
            for fragment in include_targets(value, &builder)? {
                let fragment_path = origin
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(fragment);
                tracing::debug!("including fragment {}", fragment_path.display());
                children.extend(parse_fragment(&fragment_path, stack)?);
            }
            continue;
        }
        builder.add_value(&mut children, &mut BTreeMap::new(), "", key, value, &root_location)?;
    }

    Ok(children)
}

fn include_targets<'v>(
    value: &'v toml::Value,
    builder: &TreeBuilder<'_>,
) -> Result<Vec<&'v str>, SpecfileError> {
    let root = Location::new(builder.file, 1, 1);
    let list = value
        .as_array()
        .ok_or_else(|| builder.syntax(INCLUDE_KEY, &root, "expected an array of paths"))?;
    list.iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| builder.syntax(INCLUDE_KEY, &root, "expected an array of paths"))
        })
        .collect()
}

fn is_element_value(value: &toml::Value) -> bool {
    match value {
        toml::Value::Table(_) => true,
        toml::Value::Array(items) => !items.is_empty() && items.iter().all(toml::Value::is_table),
        _ => false,
    }
}

struct TreeBuilder<'a> {
    file: &'a str,
    map: &'a SourceMap,
}

impl TreeBuilder<'_> {
    fn location(&self, path: &str, fallback: &Location) -> Location {
        if let Some((line, column)) = self.map.lookup(path) {
            return Location::new(self.file, line, column);
        }
        // Inline tables at the root are found by their key line.
        self.map
            .top_level_keys()
            .iter()
            .find(|(key, _)| key == path)
            .map_or_else(|| fallback.clone(), |(_, line)| Location::new(self.file, *line, 1))
    }

    fn syntax(&self, key: &str, fallback: &Location, message: &str) -> SpecfileError {
        let line = self
            .map
            .top_level_keys()
            .iter()
            .find(|(k, _)| k == key)
            .map_or(fallback.line, |(_, line)| *line);
        SpecfileError::Syntax {
            location: Location::new(self.file, line, 1),
            message: format!("'{key}': {message}"),
        }
    }

    fn build(
        &self,
        name: &str,
        path: &str,
        table: &toml::Table,
        fallback: &Location,
    ) -> Result<Element, SpecfileError> {
        let mut element = Element::new(name, self.location(path, fallback));
        let here = element.location.clone();
        let mut children = Vec::new();
        for (key, value) in table {
            self.add_value(&mut children, &mut element.attributes, path, key, value, &here)?;
        }
        element.children = children;
        Ok(element)
    }

    fn add_value(
        &self,
        children: &mut Vec<Element>,
        attributes: &mut BTreeMap<String, String>,
        parent: &str,
        key: &str,
        value: &toml::Value,
        here: &Location,
    ) -> Result<(), SpecfileError> {
        let path = child_path(parent, key);
        match value {
            toml::Value::Table(table) => children.push(self.build(key, &path, table, here)?),
            toml::Value::Array(items) if is_element_value(value) => {
                for (index, item) in items.iter().enumerate() {
                    if let toml::Value::Table(table) = item {
                        let item_path = format!("{path}[{index}]");
                        children.push(self.build(key, &item_path, table, here)?);
                    }
                }
            }
            toml::Value::Array(_) => {
                return Err(SpecfileError::Syntax {
                    location: here.clone(),
                    message: format!(
                        "'{key}': arrays of values are not supported, use an array of tables"
                    ),
                });
            }
            toml::Value::String(s) => {
                attributes.insert(key.to_string(), s.clone());
            }
            other => {
                attributes.insert(key.to_string(), other.to_string());
            }
        }
        Ok(())
    }
}
