//! Validate command implementation
//!
//! Implements `boltroot validate` to check a package specification file.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::specfile::Specfile;

/// Execute the validate command
pub fn execute(path: &Path, serialize: bool, output: &OutputConfig) -> Result<()> {
    let specfile = Specfile::load(path)?;

    if serialize {
        println!("{}", specfile.serialize()?);
        return Ok(());
    }

    let name = specfile.source_name()?;
    let version = specfile.latest_version()?;
    tracing::info!("digest {}", specfile.digest()?);

    output.success(&format!("{name} {version} is valid"));
    let packages = specfile.binary_packages();
    if !packages.is_empty() {
        output.info(&format!("Binary packages: {}", packages.join(", ")));
    }

    Ok(())
}
