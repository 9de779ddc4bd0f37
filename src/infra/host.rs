//! Host collaborators
//!
//! Everything the engine needs from the build host goes through [`Host`], so
//! bootstrapping can be exercised with a fake in tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::defaults::{EXTRA_EXECUTABLE_DIRS, PACKAGE_MANAGER};
use crate::error::ToolchainError;

/// Services provided by the build host
pub trait Host {
    /// Refresh package metadata inside `sysroot`
    fn refresh_metadata(&self, sysroot: &Path) -> Result<(), ToolchainError>;

    /// Find an executable on the host
    fn locate_executable(&self, name: &str) -> Option<PathBuf>;
}

/// The real host: `opkg` and the process `PATH`
#[derive(Debug, Clone, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn refresh_metadata(&self, sysroot: &Path) -> Result<(), ToolchainError> {
        let opkg = find_executable(PACKAGE_MANAGER).ok_or_else(|| ToolchainError::Spawn {
            program: PACKAGE_MANAGER.to_string(),
            error: "not found on the host".to_string(),
        })?;

        tracing::info!("refreshing package metadata in {}", sysroot.display());
        let mut cmd = Command::new(opkg);
        cmd.arg("--offline-root").arg(sysroot).arg("update");
        run(&mut cmd)
    }

    fn locate_executable(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// Search `PATH` followed by the well-known system directories
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();
    dirs.extend(EXTRA_EXECUTABLE_DIRS.iter().map(PathBuf::from));
    find_executable_in(name, &dirs)
}

/// Search an explicit list of directories
pub fn find_executable_in(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let paths: OsString = std::env::join_paths(dirs).ok()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    which::which_in(name, Some(paths), cwd).ok()
}

/// Run a command to completion, failing on a non-zero exit
pub fn run(cmd: &mut Command) -> Result<(), ToolchainError> {
    let rendered = render(cmd);
    tracing::debug!("running {rendered}");

    let status = cmd.status().map_err(|e| ToolchainError::Spawn {
        program: cmd.get_program().to_string_lossy().into_owned(),
        error: e.to_string(),
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(ToolchainError::CommandFailed {
            command: rendered,
            status: status.to_string(),
        })
    }
}

fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
