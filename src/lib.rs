//! Boltroot - embedded root filesystem generator
//!
//! This library validates package specification files and drives the
//! bootstrap, customization and cleanup of target root filesystems.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Document model, validation and image generation
//! - [`infra`] - Infrastructure layer (filesystem, processes, directories)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
