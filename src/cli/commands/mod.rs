//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod cleanup;
pub mod customize;
pub mod prepare;
pub mod validate;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::core::generator::GeneratorConfig;
use crate::core::global_config::{GlobalConfig, ImageConfig};
use crate::infra::dirs::BoltDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a package specification file
    Validate {
        /// Path to the specification file
        specfile: PathBuf,

        /// Print the validated document as JSON
        #[arg(long)]
        serialize: bool,
    },

    /// Bootstrap an empty root filesystem
    Prepare {
        /// Root directory to populate
        sysroot: PathBuf,

        #[command(flatten)]
        image: ImageArgs,
    },

    /// Apply an image specification to a prepared root
    Customize {
        /// Prepared root directory
        sysroot: PathBuf,

        /// Image specification file
        specfile: PathBuf,

        #[command(flatten)]
        image: ImageArgs,
    },

    /// Remove build-time state from a root
    Cleanup {
        /// Root directory to clean
        sysroot: PathBuf,

        #[command(flatten)]
        image: ImageArgs,
    },
}

/// Image settings shared by the generator commands
#[derive(Args, Debug, Clone, Default)]
pub struct ImageArgs {
    /// Distribution release
    #[arg(long)]
    pub release: Option<String>,

    /// Target architecture (defaults to the host architecture)
    #[arg(long)]
    pub arch: Option<String>,

    /// Target C library
    #[arg(long)]
    pub libc: Option<String>,

    /// Base URL of the package archive
    #[arg(long)]
    pub repo_base: Option<String>,

    /// Skip package signature verification
    #[arg(long)]
    pub no_verify: bool,

    /// Stage a QEMU user emulator into the root
    #[arg(long)]
    pub copy_qemu: bool,
}

impl ImageArgs {
    /// Command-line layer of the image settings
    #[must_use]
    pub fn to_image_config(&self) -> ImageConfig {
        ImageConfig {
            release: self.release.clone(),
            arch: self.arch.clone(),
            libc: self.libc.clone(),
            verify: self.no_verify.then_some(false),
            copy_qemu: self.copy_qemu.then_some(true),
            repo_base: self.repo_base.clone(),
            host_root: None,
        }
    }

    /// Merge with the global configuration and apply defaults
    pub fn resolve(&self) -> Result<GeneratorConfig> {
        let dirs = BoltDirs::new();
        let global = GlobalConfig::load(&dirs)?;
        tracing::debug!(
            "using configuration from {}",
            dirs.global_config_path().display()
        );
        Ok(self.to_image_config().or(global.image).resolve()?)
    }
}

impl Commands {
    /// Execute the command
    pub fn run(self, output: &OutputConfig) -> Result<()> {
        match self {
            Self::Validate {
                specfile,
                serialize,
            } => validate::execute(&specfile, serialize, output),
            Self::Prepare { sysroot, image } => prepare::execute(&sysroot, &image.resolve()?, output),
            Self::Customize {
                sysroot,
                specfile,
                image,
            } => customize::execute(&sysroot, &specfile, &image.resolve()?, output),
            Self::Cleanup { sysroot, image } => cleanup::execute(&sysroot, &image.resolve()?, output),
        }
    }
}
