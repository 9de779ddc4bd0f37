//! Scoped environment for directives
//!
//! Directives never see the invoking process environment directly. Each
//! customization run builds a fresh [`Environment`] from an
//! [`AmbientEnvironment`] snapshot: only the session variables in
//! [`PRESERVED_VARIABLES`] and anything under [`BUILD_VARIABLE_PREFIX`]
//! survive, then the build identity is written over the top.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::defaults::{BUILD_VARIABLE_PREFIX, PRESERVED_VARIABLES};

/// Target root of the build
pub const SYSROOT_VARIABLE: &str = "BOLT_SYSROOT";
/// Distribution release
pub const RELEASE_VARIABLE: &str = "BOLT_RELEASE";
/// Target architecture
pub const ARCH_VARIABLE: &str = "BOLT_ARCH";
/// Target C library
pub const LIBC_VARIABLE: &str = "BOLT_LIBC";

/// Snapshot of the variables a run may draw from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientEnvironment {
    vars: BTreeMap<String, String>,
}

impl AmbientEnvironment {
    /// Capture the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are dropped.
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = pairs
            .into_iter()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Build a snapshot from explicit pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Values the engine computes and no caller can override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    /// Canonical target root
    pub sysroot: PathBuf,
    /// Distribution release
    pub release: String,
    /// Target architecture
    pub arch: String,
    /// Target C library
    pub libc: String,
}

/// Immutable variable mapping handed to every directive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Scope `ambient` down and inject `identity`
    pub fn scoped(ambient: &AmbientEnvironment, identity: &BuildIdentity) -> Self {
        let mut vars: BTreeMap<String, String> = ambient
            .vars
            .iter()
            .filter(|(key, _)| is_passed_through(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        vars.insert(
            SYSROOT_VARIABLE.to_string(),
            identity.sysroot.display().to_string(),
        );
        vars.insert(RELEASE_VARIABLE.to_string(), identity.release.clone());
        vars.insert(ARCH_VARIABLE.to_string(), identity.arch.clone());
        vars.insert(LIBC_VARIABLE.to_string(), identity.libc.clone());

        Self { vars }
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether the variable is set
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Variables sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Target root the environment was built for
    pub fn sysroot(&self) -> Option<&Path> {
        self.get(SYSROOT_VARIABLE).map(Path::new)
    }
}

fn is_passed_through(key: &str) -> bool {
    key.starts_with(BUILD_VARIABLE_PREFIX) || PRESERVED_VARIABLES.contains(&key)
}
