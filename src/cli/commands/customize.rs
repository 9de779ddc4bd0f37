//! Customize command implementation
//!
//! Implements `boltroot customize` to apply an image specification.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::generator::{GeneratorConfig, ImageGenerator};

/// Execute the customize command
pub fn execute(
    sysroot: &Path,
    specfile: &Path,
    config: &GeneratorConfig,
    output: &OutputConfig,
) -> Result<()> {
    ImageGenerator::new(config.clone()).customize(sysroot, specfile)?;

    output.success(&format!(
        "Applied {} to {}",
        specfile.display(),
        sysroot.display()
    ));
    Ok(())
}
