//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use boltroot::core::generator::GeneratorConfig;
use boltroot::error::ToolchainError;
use boltroot::infra::host::Host;

/// Test workspace context
///
/// Creates a temporary directory holding an empty target root under `root/`
/// and a fake host filesystem under `host/`.
pub struct TestSysroot {
    /// Temporary directory for the test
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestSysroot {
    /// Create a workspace with an empty root and a seeded host root
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(dir.path().join("root")).expect("Failed to create root");
        let sysroot = Self { dir };
        sysroot.create_file("host/etc/hosts", HOST_HOSTS);
        sysroot.create_file("host/etc/resolv.conf", HOST_RESOLV_CONF);
        sysroot
    }

    /// Get the path to the workspace directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Path of the target root
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    /// Path of the fake host root
    pub fn host_root(&self) -> PathBuf {
        self.dir.path().join("host")
    }

    /// Generator settings reading host files from the fake host root
    pub fn config(&self, arch: &str) -> GeneratorConfig {
        let mut config = GeneratorConfig::new("zeus", arch);
        config.host_root = self.host_root();
        config
    }

    /// Create a file relative to the workspace
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Check if a path exists inside the root
    pub fn root_has(&self, name: &str) -> bool {
        self.root().join(name).symlink_metadata().is_ok()
    }

    /// Read a file from inside the root
    pub fn read_root_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.root().join(name)).expect("Failed to read file")
    }

    /// Permission bits of a path inside the root
    pub fn root_mode(&self, name: &str) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(self.root().join(name))
            .expect("Failed to stat path")
            .permissions()
            .mode()
            & 0o7777
    }
}

impl Default for TestSysroot {
    fn default() -> Self {
        Self::new()
    }
}

/// Host double recording metadata refreshes
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeHost {
    /// Roots passed to `refresh_metadata`
    pub refreshed: RefCell<Vec<PathBuf>>,
    /// Executables this host knows about
    pub executables: Vec<(String, PathBuf)>,
    /// Fail metadata refreshes
    pub fail_refresh: bool,
}

#[allow(dead_code)]
impl FakeHost {
    /// Host knowing a single executable
    pub fn with_executable(name: &str, path: &Path) -> Self {
        Self {
            executables: vec![(name.to_string(), path.to_path_buf())],
            ..Self::default()
        }
    }
}

impl Host for FakeHost {
    fn refresh_metadata(&self, sysroot: &Path) -> Result<(), ToolchainError> {
        self.refreshed.borrow_mut().push(sysroot.to_path_buf());
        if self.fail_refresh {
            return Err(ToolchainError::CommandFailed {
                command: format!("opkg --offline-root {} update", sysroot.display()),
                status: "exit status: 255".to_string(),
            });
        }
        Ok(())
    }

    fn locate_executable(&self, name: &str) -> Option<PathBuf> {
        self.executables
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, path)| path.clone())
    }
}

/// Whether the tests run as root, where permission checks do not apply
#[allow(dead_code)]
pub fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self").map(|m| m.uid() == 0).unwrap_or(false)
}

/// Hosts file of the fake host
pub const HOST_HOSTS: &str = "127.0.0.1 localhost\n10.0.0.5 buildhost\n";

/// Resolver configuration of the fake host
pub const HOST_RESOLV_CONF: &str = "nameserver 10.0.0.1\n";

/// Sample package specification for testing
#[allow(dead_code)]
pub const SAMPLE_SPECFILE: &str = r#"
[source]
name = "hello"
[source.description]
summary = "Prints a friendly greeting"
[[source.requires.package]]
name = "gcc"
version = ">= 9.0"

[[package]]
name = "hello"
[[package.requires.package]]
name = "libc"
version = "=="

[changelog]
[[changelog.release]]
version = "2.3"
epoch = 1
revision = "4"
email = "jane@example.org"
date = "2021-03-04 12:30:00 +0100"
"#;

/// Sample image specification for testing
#[allow(dead_code)]
pub const SAMPLE_IMAGE: &str = r#"
[[mkdir]]
path = "/srv/www"
mode = 0o750

[[file]]
path = "/etc/motd"
content = "welcome\n"

[[symlink]]
path = "/srv/current"
target = "www"
"#;
