//! Structural grammar for specification documents
//!
//! The grammar lives in a TOML file found through a fixed search path
//! ([`crate::config::defaults::SCHEMA_SEARCH_PATH`]). It names the root
//! element and, for each element, the attributes it may carry and the
//! children it may contain with their cardinality:
//!
//! ```toml
//! root = "control"
//!
//! [element.control.children]
//! source = "one"
//! package = "zero-or-more"
//!
//! [element.source.attributes]
//! name = "required"
//! ```
//!
//! Rules are looked up as `parent/name` first, then `name`, so the same
//! tag can have a context-specific shape.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::SCHEMA_SEARCH_PATH;
use crate::core::element::Element;
use crate::error::{SchemaError, Violation};

/// How often a child element may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// Exactly once
    One,
    /// At most once
    Optional,
    /// Any number of times
    ZeroOrMore,
    /// At least once
    OneOrMore,
}

impl Cardinality {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::One => count == 1,
            Self::Optional => count <= 1,
            Self::ZeroOrMore => true,
            Self::OneOrMore => count >= 1,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::One => "exactly one",
            Self::Optional => "at most one",
            Self::ZeroOrMore => "any number of",
            Self::OneOrMore => "at least one",
        }
    }
}

/// Whether an attribute must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    /// Must be present
    Required,
    /// May be present
    Optional,
}

/// Shape of one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementRule {
    /// Allowed attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Presence>,
    /// Allowed children
    #[serde(default)]
    pub children: BTreeMap<String, Cardinality>,
}

/// A loaded structural grammar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    root: String,
    #[serde(default, rename = "element")]
    elements: BTreeMap<String, ElementRule>,
}

impl Schema {
    /// Parse a schema from TOML text
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, SchemaError> {
        toml::from_str(content).map_err(|e| SchemaError::Invalid {
            path: origin.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load a schema file
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Invalid {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content, path)
    }

    /// Name of the root element
    pub fn root(&self) -> &str {
        &self.root
    }

    fn rule(&self, parent: Option<&str>, name: &str) -> Option<&ElementRule> {
        parent
            .and_then(|p| self.elements.get(&format!("{p}/{name}")))
            .or_else(|| self.elements.get(name))
    }

    /// Check `document` against the grammar, collecting every violation
    pub fn validate(&self, document: &Element) -> Vec<Violation> {
        let mut violations = Vec::new();

        if document.name() != self.root {
            violations.push(Violation::new(
                document.location().clone(),
                format!(
                    "expected root element '{}', found '{}'",
                    self.root,
                    document.name()
                ),
            ));
            return violations;
        }

        self.check(document, None, &mut violations);
        violations
    }

    fn check(&self, element: &Element, parent: Option<&str>, violations: &mut Vec<Violation>) {
        let empty = ElementRule::default();
        let rule = self.rule(parent, element.name()).unwrap_or(&empty);
        let here = element.location();

        for (name, presence) in &rule.attributes {
            if *presence == Presence::Required && element.attribute(name).is_none() {
                violations.push(Violation::new(
                    here.clone(),
                    format!(
                        "element '{}' is missing required attribute '{name}'",
                        element.name()
                    ),
                ));
            }
        }
        for name in element.attributes().keys() {
            if !rule.attributes.contains_key(name) {
                violations.push(Violation::new(
                    here.clone(),
                    format!(
                        "attribute '{name}' is not allowed on element '{}'",
                        element.name()
                    ),
                ));
            }
        }

        for (name, cardinality) in &rule.children {
            let count = element.children_named(name).count();
            if !cardinality.accepts(count) {
                violations.push(Violation::new(
                    here.clone(),
                    format!(
                        "element '{}' must contain {} '{name}', found {count}",
                        element.name(),
                        cardinality.describe()
                    ),
                ));
            }
        }

        for child in element.children() {
            if rule.children.contains_key(child.name()) {
                self.check(child, Some(element.name()), violations);
            } else {
                violations.push(Violation::new(
                    child.location().clone(),
                    format!(
                        "element '{}' is not allowed inside '{}'",
                        child.name(),
                        element.name()
                    ),
                ));
            }
        }
    }
}

/// Ordered list of places a schema file may live
#[derive(Debug, Clone)]
pub struct SchemaLocator {
    search_path: Vec<PathBuf>,
}

impl Default for SchemaLocator {
    fn default() -> Self {
        Self::new(SCHEMA_SEARCH_PATH.iter().map(PathBuf::from).collect())
    }
}

impl SchemaLocator {
    /// Create a locator over explicit paths
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Candidate paths in search order
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// First existing schema file
    pub fn locate(&self) -> Result<&Path, SchemaError> {
        self.search_path
            .iter()
            .find(|p| p.is_file())
            .map(PathBuf::as_path)
            .ok_or_else(|| SchemaError::NotFound {
                searched: self.search_path.clone(),
            })
    }

    /// Locate and load the schema
    pub fn load(&self) -> Result<Schema, SchemaError> {
        let path = self.locate()?;
        tracing::debug!("using structural schema {}", path.display());
        Schema::load(path)
    }
}
