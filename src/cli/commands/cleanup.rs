//! Cleanup command implementation
//!
//! Implements `boltroot cleanup` to strip build-time state from a root.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::generator::{GeneratorConfig, ImageGenerator};

/// Execute the cleanup command
pub fn execute(sysroot: &Path, config: &GeneratorConfig, output: &OutputConfig) -> Result<()> {
    ImageGenerator::new(config.clone()).cleanup(sysroot)?;

    output.success(&format!("Cleaned {}", sysroot.display()));
    Ok(())
}
