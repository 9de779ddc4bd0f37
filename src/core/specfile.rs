//! Validated package specification
//!
//! A [`Specfile`] is only ever constructed from a document that passed both
//! the structural pass ([`crate::core::schema`]) and the format pass
//! ([`crate::core::format`]). Afterwards it is read-only.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::core::element::{self, Element};
use crate::core::format::validate_format;
use crate::core::schema::{Schema, SchemaLocator};
use crate::core::version::compose_version;
use crate::error::{BoltError, InvocationError, SpecfileError};

/// One changelog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    /// Version without epoch or revision
    pub version: String,
    /// Epoch, if any
    pub epoch: Option<String>,
    /// Packaging revision, if any
    pub revision: Option<String>,
    /// Upstream version the release packages
    pub upstream_version: Option<String>,
    /// Maintainer email
    pub email: Option<String>,
    /// Release timestamp
    pub date: Option<String>,
    /// Maintainer name
    pub maintainer: Option<String>,
}

impl Release {
    fn from_element(element: &Element) -> Self {
        let get = |key: &str| element.attribute(key).map(ToString::to_string);
        Self {
            version: element.attribute("version").unwrap_or_default().to_string(),
            epoch: get("epoch"),
            revision: get("revision"),
            upstream_version: get("upstream-version"),
            email: get("email"),
            date: get("date"),
            maintainer: get("maintainer"),
        }
    }

    /// `[epoch:]version[-revision]`
    pub fn full_version(&self) -> String {
        compose_version(self.epoch.as_deref(), &self.version, self.revision.as_deref())
    }
}

/// A validated specification document
#[derive(Debug, Clone)]
pub struct Specfile {
    document: Element,
}

impl Specfile {
    /// Load and validate a specification file using the installed schema
    pub fn load(path: &Path) -> Result<Self, BoltError> {
        let schema = SchemaLocator::default().load()?;
        Self::load_with_schema(path, &schema)
    }

    /// Load and validate a specification file against `schema`
    pub fn load_with_schema(path: &Path, schema: &Schema) -> Result<Self, BoltError> {
        if !path.is_file() {
            return Err(InvocationError::NoSuchFile {
                path: path.to_path_buf(),
            }
            .into());
        }

        tracing::debug!("loading specification {}", path.display());
        let document = element::parse_file(path)?;
        Ok(Self::validate(document, schema)?)
    }

    /// Validate specification text; includes resolve relative to `origin`
    pub fn parse(text: &str, origin: &Path, schema: &Schema) -> Result<Self, SpecfileError> {
        let document = element::parse_str(text, origin)?;
        Self::validate(document, schema)
    }

    /// Run the structural pass, then the format pass
    pub fn validate(document: Element, schema: &Schema) -> Result<Self, SpecfileError> {
        let violations = schema.validate(&document);
        if !violations.is_empty() {
            return Err(SpecfileError::Structure { violations });
        }

        let violations = validate_format(&document);
        if !violations.is_empty() {
            return Err(SpecfileError::Format { violations });
        }

        Ok(Self { document })
    }

    /// The validated element tree
    pub fn document(&self) -> &Element {
        &self.document
    }

    /// Name of the source package
    pub fn source_name(&self) -> Result<&str, SpecfileError> {
        self.document
            .child("source")
            .and_then(|s| s.attribute("name"))
            .ok_or_else(|| SpecfileError::Missing {
                what: "source/@name".to_string(),
            })
    }

    /// Changelog entries, newest first
    pub fn releases(&self) -> Vec<Release> {
        self.document
            .child("changelog")
            .map(|c| c.children_named("release").map(Release::from_element).collect())
            .unwrap_or_default()
    }

    fn newest_release(&self) -> Option<&Element> {
        self.document.child("changelog")?.child("release")
    }

    /// Version of the newest release as `[epoch:]version[-revision]`
    pub fn latest_version(&self) -> Result<String, SpecfileError> {
        let release = self.newest_release().ok_or_else(|| SpecfileError::Missing {
            what: "changelog/release".to_string(),
        })?;
        let version = release
            .attribute("version")
            .ok_or_else(|| SpecfileError::Missing {
                what: "changelog/release/@version".to_string(),
            })?;
        Ok(compose_version(
            release.attribute("epoch"),
            version,
            release.attribute("revision"),
        ))
    }

    /// Binary package names in document order
    pub fn binary_packages(&self) -> Vec<&str> {
        self.document
            .children_named("package")
            .filter_map(|p| p.attribute("name"))
            .collect()
    }

    /// Upstream version of the newest release
    pub fn upstream_version(&self) -> Option<&str> {
        self.newest_release()?.attribute("upstream-version")
    }

    /// Short description of the source package, empty if absent
    pub fn summary(&self) -> &str {
        self.document
            .child("source")
            .and_then(|s| s.child("description"))
            .and_then(|d| d.attribute("summary"))
            .unwrap_or("")
    }

    /// Canonical rendering of the document
    pub fn serialize(&self) -> Result<String, SpecfileError> {
        serde_json::to_string_pretty(&self.document)
            .map_err(|e| SpecfileError::Serialize(e.to_string()))
    }

    /// SHA-256 of [`Self::serialize`], hex encoded
    pub fn digest(&self) -> Result<String, SpecfileError> {
        let rendered = self.serialize()?;
        Ok(hex::encode(Sha256::digest(rendered.as_bytes())))
    }
}
