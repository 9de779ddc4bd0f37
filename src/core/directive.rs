//! Directive kinds
//!
//! A directive is one unit of work from an image specification. The engine
//! only relies on [`Directive::apply`]; concrete kinds are created by
//! factories registered under a tag in a [`DirectiveRegistry`].
//!
//! Built-in kinds:
//!
//! | tag        | keys                                   |
//! |------------|----------------------------------------|
//! | `packages` | `install = [..]`                       |
//! | `run`      | `script`, optional `[run.env]` table   |
//! | `file`     | `path`, `content`, optional `mode`     |
//! | `mkdir`    | `path`, optional `mode`                |
//! | `symlink`  | `path`, `target`                       |
//!
//! Paths are relative to the target root; a leading `/` is allowed and `..`
//! is not.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::config::defaults::PACKAGE_MANAGER;
use crate::core::build_env::Environment;
use crate::infra::{filesystem, host};

/// A unit of work applied to a target root
pub trait Directive: fmt::Debug {
    /// Short name of the kind, used in logs
    fn kind(&self) -> &'static str;

    /// Apply the directive to `sysroot` with the scoped environment
    fn apply(&self, sysroot: &Path, env: &Environment) -> Result<()>;
}

/// Creates a directive from the body of its table
pub type DirectiveFactory = Box<dyn Fn(&toml::Table) -> Result<Box<dyn Directive>, String>>;

/// Mapping from tag to factory
pub struct DirectiveRegistry {
    factories: BTreeMap<String, DirectiveFactory>,
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DirectiveRegistry {
    /// Registry without any kinds
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in kinds
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("packages", parse::<PackagesDirective>);
        registry.register("run", parse::<RunDirective>);
        registry.register("file", parse::<FileDirective>);
        registry.register("mkdir", parse::<MkdirDirective>);
        registry.register("symlink", parse::<SymlinkDirective>);
        registry
    }

    /// Register a factory, replacing any previous one for `tag`
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&toml::Table) -> Result<Box<dyn Directive>, String> + 'static,
    {
        self.factories.insert(tag.into(), Box::new(factory));
    }

    /// Whether `tag` names a known kind
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build a directive; `None` if the tag is unknown
    pub fn build(&self, tag: &str, body: &toml::Table) -> Option<Result<Box<dyn Directive>, String>> {
        self.factories.get(tag).map(|factory| factory(body))
    }
}

/// Built-in kinds validate their own body after deserializing
trait Body: DeserializeOwned + Directive + 'static {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

fn parse<T: Body>(body: &toml::Table) -> Result<Box<dyn Directive>, String> {
    let directive: T = toml::Value::Table(body.clone())
        .try_into()
        .map_err(|e: toml::de::Error| e.message().to_string())?;
    directive.check()?;
    Ok(Box::new(directive))
}

/// Check that `path` stays inside the root
fn check_relative(path: &str) -> Result<(), String> {
    let relative = Path::new(path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return Err(format!("'{path}' does not name an entry below the root"));
    }
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(format!("'{path}' must not contain '..'"));
    }
    Ok(())
}

fn in_root(sysroot: &Path, path: &str) -> PathBuf {
    sysroot.join(path.trim_start_matches('/'))
}

fn scoped_command(program: &Path, sysroot: &Path, env: &Environment) -> Command {
    let mut cmd = Command::new(program);
    cmd.current_dir(sysroot)
        .env_clear()
        .envs(env.iter());
    cmd
}

// ============================================
// packages
// ============================================

/// Install packages into the root with the package manager
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagesDirective {
    /// Package names
    pub install: Vec<String>,
}

impl Body for PackagesDirective {
    fn check(&self) -> Result<(), String> {
        if self.install.is_empty() {
            return Err("'install' lists no packages".to_string());
        }
        Ok(())
    }
}

impl Directive for PackagesDirective {
    fn kind(&self) -> &'static str {
        "packages"
    }

    fn apply(&self, sysroot: &Path, env: &Environment) -> Result<()> {
        let opkg = host::find_executable(PACKAGE_MANAGER)
            .with_context(|| format!("{PACKAGE_MANAGER} not found on the host"))?;

        let mut cmd = scoped_command(&opkg, sysroot, env);
        cmd.arg("--offline-root")
            .arg(sysroot)
            .arg("install")
            .args(&self.install);
        host::run(&mut cmd)?;
        Ok(())
    }
}

// ============================================
// run
// ============================================

/// Run a shell script inside the root directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunDirective {
    /// Script passed to `sh -c`
    pub script: String,
    /// Extra variables; the build identity still wins
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Body for RunDirective {}

impl Directive for RunDirective {
    fn kind(&self) -> &'static str {
        "run"
    }

    fn apply(&self, sysroot: &Path, env: &Environment) -> Result<()> {
        let sh = host::find_executable("sh").context("no shell found on the host")?;

        let mut cmd = Command::new(sh);
        cmd.current_dir(sysroot)
            .env_clear()
            .envs(&self.env)
            .envs(env.iter())
            .arg("-c")
            .arg(&self.script);
        host::run(&mut cmd)?;
        Ok(())
    }
}

// ============================================
// file
// ============================================

fn default_file_mode() -> u32 {
    0o644
}

fn default_dir_mode() -> u32 {
    0o755
}

/// Write a file with a mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDirective {
    /// Root-relative path
    pub path: String,
    /// File content
    pub content: String,
    /// Permission bits
    #[serde(default = "default_file_mode")]
    pub mode: u32,
}

impl Body for FileDirective {
    fn check(&self) -> Result<(), String> {
        check_relative(&self.path)
    }
}

impl Directive for FileDirective {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn apply(&self, sysroot: &Path, _env: &Environment) -> Result<()> {
        filesystem::write_file_with_mode(&in_root(sysroot, &self.path), &self.content, self.mode)?;
        Ok(())
    }
}

// ============================================
// mkdir
// ============================================

/// Create a directory with a mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MkdirDirective {
    /// Root-relative path
    pub path: String,
    /// Permission bits
    #[serde(default = "default_dir_mode")]
    pub mode: u32,
}

impl Body for MkdirDirective {
    fn check(&self) -> Result<(), String> {
        check_relative(&self.path)
    }
}

impl Directive for MkdirDirective {
    fn kind(&self) -> &'static str {
        "mkdir"
    }

    fn apply(&self, sysroot: &Path, _env: &Environment) -> Result<()> {
        filesystem::create_dir_with_mode(&in_root(sysroot, &self.path), self.mode)?;
        Ok(())
    }
}

// ============================================
// symlink
// ============================================

/// Create or replace a symlink
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymlinkDirective {
    /// Root-relative path of the link
    pub path: String,
    /// Link target, stored verbatim
    pub target: String,
}

impl Body for SymlinkDirective {
    fn check(&self) -> Result<(), String> {
        check_relative(&self.path)
    }
}

impl Directive for SymlinkDirective {
    fn kind(&self) -> &'static str {
        "symlink"
    }

    fn apply(&self, sysroot: &Path, _env: &Environment) -> Result<()> {
        filesystem::replace_symlink(Path::new(&self.target), &in_root(sysroot, &self.path))?;
        Ok(())
    }
}
