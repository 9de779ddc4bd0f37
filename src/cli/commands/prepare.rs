//! Prepare command implementation
//!
//! Implements `boltroot prepare` to bootstrap an empty root.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::generator::{GeneratorConfig, ImageGenerator};

/// Execute the prepare command
pub fn execute(sysroot: &Path, config: &GeneratorConfig, output: &OutputConfig) -> Result<()> {
    tracing::info!(
        "Preparing {} for {} {} ({})",
        sysroot.display(),
        config.release,
        config.arch,
        config.libc
    );

    ImageGenerator::new(config.clone()).prepare(sysroot)?;

    output.success(&format!("Prepared {}", sysroot.display()));
    Ok(())
}
