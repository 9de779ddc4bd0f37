//! Global configuration management
//!
//! Reads image defaults from the `[image]` table of `config.toml` in the
//! config directory:
//!
//! ```toml
//! [image]
//! release = "zeus"
//! arch = "aarch64"
//! libc = "musl"
//! verify = true
//! repo_base = "http://mirror.example.org/dists"
//! ```
//!
//! Command-line values win over the file, the file wins over built-in
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults::DEFAULT_LIBC;
use crate::config::urls::REPO_BASE;
use crate::core::generator::GeneratorConfig;
use crate::error::ConfigError;
use crate::infra::dirs::BoltDirs;

/// Global configuration for boltroot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Image generation defaults
    #[serde(default)]
    pub image: ImageConfig,
}

/// Partial image settings; unset fields fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Distribution release
    pub release: Option<String>,
    /// Target architecture
    pub arch: Option<String>,
    /// Target C library
    pub libc: Option<String>,
    /// Verify package signatures
    pub verify: Option<bool>,
    /// Stage a QEMU user emulator into the root
    pub copy_qemu: Option<bool>,
    /// Base URL of the package archive
    pub repo_base: Option<String>,
    /// Root the host network files are copied from
    pub host_root: Option<PathBuf>,
}

impl ImageConfig {
    /// Fill unset fields from `fallback`
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            release: self.release.or(fallback.release),
            arch: self.arch.or(fallback.arch),
            libc: self.libc.or(fallback.libc),
            verify: self.verify.or(fallback.verify),
            copy_qemu: self.copy_qemu.or(fallback.copy_qemu),
            repo_base: self.repo_base.or(fallback.repo_base),
            host_root: self.host_root.or(fallback.host_root),
        }
    }

    /// Apply built-in defaults; `release` has none
    pub fn resolve(self) -> Result<GeneratorConfig, ConfigError> {
        let release = self.release.ok_or_else(|| ConfigError::MissingValue {
            name: "release".to_string(),
        })?;

        Ok(GeneratorConfig {
            release,
            arch: self.arch.unwrap_or_else(host_arch),
            libc: self.libc.unwrap_or_else(|| DEFAULT_LIBC.to_string()),
            verify: self.verify.unwrap_or(true),
            copy_qemu: self.copy_qemu.unwrap_or(false),
            repo_base: self.repo_base.unwrap_or_else(|| REPO_BASE.to_string()),
            host_root: self.host_root.unwrap_or_else(|| PathBuf::from("/")),
        })
    }
}

/// Architecture of the running host
pub fn host_arch() -> String {
    std::env::consts::ARCH.to_string()
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the default configuration.
    pub fn load(dirs: &BoltDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }
}
