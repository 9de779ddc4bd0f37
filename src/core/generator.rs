//! Image generation
//!
//! [`ImageGenerator`] drives the three phases of building a target root:
//!
//! 1. [`prepare`](ImageGenerator::prepare) lays down the directory skeleton,
//!    identity and network seed files and the package manager configuration,
//!    then refreshes package metadata.
//! 2. [`customize`](ImageGenerator::customize) applies the directives of an
//!    image specification in document order. The first failure stops the run.
//! 3. [`cleanup`](ImageGenerator::cleanup) restores the configuration files,
//!    drops the host resolver configuration and empties scratch directories.
//!
//! All three require the root to be an existing directory and work on its
//! canonical path.

use std::path::{Path, PathBuf};

use crate::config::defaults::DEFAULT_LIBC;
use crate::config::urls::REPO_BASE;
use crate::core::build_env::{AmbientEnvironment, BuildIdentity, Environment};
use crate::core::directive::DirectiveRegistry;
use crate::core::loader;
use crate::error::{BoltError, FilesystemError, InvocationError, ToolchainError};
use crate::infra::filesystem;
use crate::infra::host::{Host, SystemHost};

/// Directories created by `prepare`, with their modes
pub const SKELETON: &[(u32, &str)] = &[
    (0o755, "dev"),
    (0o755, "etc"),
    (0o755, "etc/opkg"),
    (0o755, "etc/opkg/usign"),
    (0o755, "proc"),
    (0o755, "run"),
    (0o755, "sys"),
    (0o1777, "tmp"),
    (0o755, "usr"),
    (0o755, "usr/bin"),
    (0o755, "var"),
    (0o1777, "var/tmp"),
];

/// Directories emptied by `cleanup`
pub const SCRATCH_DIRS: &[&str] = &["tmp", "var/tmp"];

/// Host files copied into the root by `prepare`
pub const HOST_NETWORK_FILES: &[&str] = &["etc/hosts", "etc/resolv.conf"];

/// Architecture prefixes and the QEMU user emulator they need; first match wins
pub const QEMU_BINARIES: &[(&str, &str)] = &[
    ("aarch64", "qemu-aarch64-static"),
    ("arm", "qemu-arm-static"),
    ("mips64el", "qemu-mips64el-static"),
    ("mipsel", "qemu-mipsel-static"),
    ("powerpc64el", "qemu-ppc64le-static"),
    ("powerpc64le", "qemu-ppc64le-static"),
    ("ppc64le", "qemu-ppc64le-static"),
    ("powerpc", "qemu-ppc-static"),
    ("riscv64", "qemu-riscv64-static"),
    ("s390x", "qemu-s390x-static"),
];

const ETC_PASSWD: &str = "\
root:x:0:0:root:/root:/bin/sh
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
bin:x:2:2:bin:/bin:/usr/sbin/nologin
sys:x:3:3:sys:/dev:/usr/sbin/nologin
sync:x:4:65534:sync:/bin:/bin/sync
games:x:5:60:games:/usr/games:/usr/sbin/nologin
man:x:6:12:man:/var/cache/man:/usr/sbin/nologin
lp:x:7:7:lp:/var/spool/lpd:/usr/sbin/nologin
mail:x:8:8:mail:/var/mail:/usr/sbin/nologin
news:x:9:9:news:/var/spool/news:/usr/sbin/nologin
uucp:x:10:10:uucp:/var/spool/uucp:/usr/sbin/nologin
proxy:x:13:13:proxy:/bin:/usr/sbin/nologin
www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin
backup:x:34:34:backup:/var/backups:/usr/sbin/nologin
list:x:38:38:Mailing List Manager:/var/list:/usr/sbin/nologin
irc:x:39:39:ircd:/var/run/ircd:/usr/sbin/nologin
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin
";

const ETC_GROUP: &str = "\
root:x:0:
daemon:x:1:
bin:x:2:
sys:x:3:
adm:x:4:
tty:x:5:
disk:x:6:
lp:x:7:
mail:x:8:
news:x:9:
uucp:x:10:
man:x:12:
proxy:x:13:
kmem:x:15:
dialout:x:20:
fax:x:21:
voice:x:22:
cdrom:x:24:
floppy:x:25:
tape:x:26:
sudo:x:27:
audio:x:29:
dip:x:30:
www-data:x:33:
backup:x:34:
operator:x:37:
list:x:38:
irc:x:39:
src:x:40:
shadow:x:42:
utmp:x:43:
video:x:44:
sasl:x:45:
plugdev:x:46:
staff:x:50:
games:x:60:
users:x:100:
nogroup:x:65534:
";

const ETC_HOSTS: &str = "\
127.0.0.1 localhost

::1     localhost ip6-localhost ip6-loopback
ff02::1 ip6-allnodes
ff02::2 ip6-allrouters
";

/// Settings of one image build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Distribution release
    pub release: String,
    /// Target architecture
    pub arch: String,
    /// Target C library
    pub libc: String,
    /// Verify package signatures
    pub verify: bool,
    /// Stage a QEMU user emulator into the root
    pub copy_qemu: bool,
    /// Base URL of the package archive
    pub repo_base: String,
    /// Root the host network files are copied from
    pub host_root: PathBuf,
}

impl GeneratorConfig {
    /// Configuration with defaults for everything but release and architecture
    pub fn new(release: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            arch: arch.into(),
            libc: DEFAULT_LIBC.to_string(),
            verify: true,
            copy_qemu: false,
            repo_base: REPO_BASE.to_string(),
            host_root: PathBuf::from("/"),
        }
    }

    /// `etc/opkg/arch.conf`
    pub fn arch_conf(&self) -> String {
        format!("arch {} 1\narch all 1\n", self.arch)
    }

    /// `etc/opkg/options.conf`
    pub fn options_conf(&self) -> String {
        let check_signature = if self.verify {
            "option check_signature"
        } else {
            ""
        };
        format!(
            "dest root /\n\
             \n\
             option signature_type usign\n\
             option no_install_recommends\n\
             option force_removal_of_dependent_packages\n\
             option force_postinstall\n\
             \n\
             {check_signature}\n"
        )
    }

    /// `etc/opkg/feeds.conf`
    pub fn feeds_conf(&self) -> String {
        format!(
            "src/gz main {}/{}/core/{}/{}/main\n",
            self.repo_base, self.release, self.arch, self.libc
        )
    }

    /// Files (re)written by `prepare` and `cleanup`, relative to the root
    pub fn config_files(&self) -> Vec<(&'static str, String)> {
        vec![
            ("etc/opkg/arch.conf", self.arch_conf()),
            ("etc/opkg/options.conf", self.options_conf()),
            ("etc/opkg/feeds.conf", self.feeds_conf()),
            ("etc/passwd", ETC_PASSWD.to_string()),
            ("etc/group", ETC_GROUP.to_string()),
            ("etc/hosts", ETC_HOSTS.to_string()),
        ]
    }
}

/// QEMU user emulator needed to run binaries of `arch`, if any
pub fn qemu_binary_for(arch: &str) -> Option<&'static str> {
    QEMU_BINARIES
        .iter()
        .find(|(prefix, _)| arch.starts_with(prefix))
        .map(|(_, binary)| *binary)
}

/// Builds target roots
#[derive(Debug)]
pub struct ImageGenerator<H: Host = SystemHost> {
    config: GeneratorConfig,
    host: H,
    ambient: AmbientEnvironment,
    registry: DirectiveRegistry,
}

impl ImageGenerator<SystemHost> {
    /// Generator using the real host and process environment
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_host(config, SystemHost)
    }
}

impl<H: Host> ImageGenerator<H> {
    /// Generator using `host` for package metadata and executable lookup
    pub fn with_host(config: GeneratorConfig, host: H) -> Self {
        Self {
            config,
            host,
            ambient: AmbientEnvironment::capture(),
            registry: DirectiveRegistry::with_builtins(),
        }
    }

    /// Replace the ambient environment snapshot
    #[must_use]
    pub fn with_ambient_environment(mut self, ambient: AmbientEnvironment) -> Self {
        self.ambient = ambient;
        self
    }

    /// Replace the directive registry
    #[must_use]
    pub fn with_registry(mut self, registry: DirectiveRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build settings
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Host collaborator
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Lay down the skeleton of a fresh root
    pub fn prepare(&self, sysroot: &Path) -> Result<(), BoltError> {
        let root = canonical_root(sysroot)?;
        tracing::info!("preparing system root {}", root.display());

        for (mode, dir) in SKELETON {
            filesystem::create_dir_with_mode(&root.join(dir), *mode)?;
        }

        let var_run = root.join("var/run");
        if var_run.symlink_metadata().is_err() {
            filesystem::replace_symlink(Path::new("../run"), &var_run)?;
        }

        if self.config.copy_qemu {
            self.copy_qemu(&root)?;
        }

        self.write_config_files(&root)?;

        for file in HOST_NETWORK_FILES {
            filesystem::copy_file(&self.config.host_root.join(file), &root.join(file))?;
        }

        self.host.refresh_metadata(&root)?;
        Ok(())
    }

    /// Apply the image specification at `specfile` to the root
    pub fn customize(&self, sysroot: &Path, specfile: &Path) -> Result<(), BoltError> {
        let root = canonical_root(sysroot)?;
        let specfile = canonical_file(specfile)?;

        tracing::info!("loading specification {}", specfile.display());
        let text = filesystem::read_file(&specfile)?;
        self.apply(&root, &text)
    }

    /// Apply image specification text to the root
    pub fn customize_text(&self, sysroot: &Path, text: &str) -> Result<(), BoltError> {
        let root = canonical_root(sysroot)?;
        self.apply(&root, text)
    }

    fn apply(&self, root: &Path, text: &str) -> Result<(), BoltError> {
        let directives = loader::load(text, &self.registry)?;
        let env = self.environment(root);

        for loaded in &directives {
            let span = tracing::info_span!(
                "directive",
                kind = loaded.kind(),
                start_line = loaded.start_line,
                end_line = loaded.end_line
            );
            let _guard = span.enter();

            tracing::info!(
                "applying {} from line {} to {}",
                loaded.kind(),
                loaded.start_line,
                loaded.end_line
            );
            loaded
                .directive
                .apply(root, &env)
                .map_err(BoltError::Directive)?;
        }

        Ok(())
    }

    /// Reset configuration and scratch space after customization
    pub fn cleanup(&self, sysroot: &Path) -> Result<(), BoltError> {
        let root = canonical_root(sysroot)?;
        tracing::info!("cleaning up system root {}", root.display());

        self.write_config_files(&root)?;
        filesystem::remove_file_if_exists(&root.join("etc/resolv.conf"))?;

        for dir in SCRATCH_DIRS {
            let path = root.join(dir);
            filesystem::require_real_dir(&path)?;
            let owner = filesystem::ownership(&path)?;
            filesystem::remove_dir_all(&path)?;
            filesystem::create_dir_all(&path)?;
            filesystem::restore_ownership(&path, owner)?;
            tracing::debug!("emptied {} (mode {:o})", path.display(), owner.mode);
        }

        Ok(())
    }

    /// Environment handed to directives for the canonical `sysroot`
    pub fn environment(&self, sysroot: &Path) -> Environment {
        let identity = BuildIdentity {
            sysroot: sysroot.to_path_buf(),
            release: self.config.release.clone(),
            arch: self.config.arch.clone(),
            libc: self.config.libc.clone(),
        };
        Environment::scoped(&self.ambient, &identity)
    }

    fn write_config_files(&self, root: &Path) -> Result<(), FilesystemError> {
        for (path, content) in self.config.config_files() {
            filesystem::write_file(&root.join(path), &content)?;
        }
        Ok(())
    }

    fn copy_qemu(&self, root: &Path) -> Result<(), BoltError> {
        let Some(binary) = qemu_binary_for(&self.config.arch) else {
            return Ok(());
        };

        let exe = self
            .host
            .locate_executable(binary)
            .ok_or_else(|| ToolchainError::EmulatorNotFound {
                binary: binary.to_string(),
            })?;

        let relative = exe.strip_prefix("/").unwrap_or(exe.as_path());
        tracing::info!("copying QEMU binary {}", exe.display());
        filesystem::copy_file(&exe, &root.join(relative))?;
        Ok(())
    }
}

fn canonical_root(sysroot: &Path) -> Result<PathBuf, BoltError> {
    if !sysroot.is_dir() {
        return Err(InvocationError::NoSuchDirectory {
            path: sysroot.to_path_buf(),
        }
        .into());
    }
    sysroot.canonicalize().map_err(|e| {
        FilesystemError::Metadata {
            path: sysroot.to_path_buf(),
            source: e,
        }
        .into()
    })
}

fn canonical_file(path: &Path) -> Result<PathBuf, BoltError> {
    if !path.is_file() {
        return Err(InvocationError::NoSuchFile {
            path: path.to_path_buf(),
        }
        .into());
    }
    path.canonicalize().map_err(|e| {
        FilesystemError::Metadata {
            path: path.to_path_buf(),
            source: e,
        }
        .into()
    })
}
