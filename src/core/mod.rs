//! Core business logic module
//!
//! Document model, validation and image generation for boltroot. Process
//! and filesystem primitives live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`version`] - Version grammar and composition
//! - [`grammar`] - Attribute grammars
//! - [`source_map`] - Line lookup for TOML documents
//! - [`element`] - Element tree built from specification files
//! - [`schema`] - Structural schema and validation
//! - [`format`] - Attribute format rules
//! - [`specfile`] - Package specification files
//! - [`build_env`] - Scoped build environment
//! - [`directive`] - Image directives and their registry
//! - [`loader`] - Image specification loader
//! - [`generator`] - Root filesystem bootstrap, customization and cleanup
//! - [`global_config`] - Global configuration management

pub mod build_env;
pub mod directive;
pub mod element;
pub mod format;
pub mod generator;
pub mod global_config;
pub mod grammar;
pub mod loader;
pub mod schema;
pub mod source_map;
pub mod specfile;
pub mod version;
