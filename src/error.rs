//! Error types for boltroot
//!
//! Domain-specific error types using thiserror.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Position of an element inside a specification file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// Base name of the file the element was read from
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
}

impl Location {
    /// Create a new location
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on line {}, column {}",
            self.file, self.line, self.column
        )
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Where the offending element starts
    pub location: Location,
    /// Human readable description
    pub message: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "* {}: {}", self.location, self.message)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("* {}", v.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Caller misuse: missing files or directories
#[derive(Error, Debug)]
pub enum InvocationError {
    /// File does not exist
    #[error("no such file '{path}'")]
    NoSuchFile { path: PathBuf },

    /// Directory does not exist
    #[error("no such directory: {path}")]
    NoSuchDirectory { path: PathBuf },
}

/// Malformed specification errors
#[derive(Error, Debug)]
pub enum SpecfileError {
    /// Document is not well-formed
    #[error("syntax error in {location}: {message}")]
    Syntax { location: Location, message: String },

    /// An included fragment could not be resolved
    #[error("failed to include '{path}': {reason}")]
    Include { path: PathBuf, reason: String },

    /// Structural validation failed
    #[error("structural validation failed:\n{}", format_violations(.violations))]
    Structure { violations: Vec<Violation> },

    /// Field format validation failed
    #[error("format errors:\n{}", format_messages(.violations))]
    Format { violations: Vec<Violation> },

    /// A required element or attribute is missing from a validated document
    #[error("specification has no '{what}'")]
    Missing { what: String },

    /// Directive tag is not registered
    #[error("unknown directive '{tag}' on line {line}")]
    UnknownDirective { tag: String, line: usize },

    /// Directive body was rejected by its kind
    #[error("invalid '{tag}' directive on line {line}: {message}")]
    InvalidDirective {
        tag: String,
        line: usize,
        message: String,
    },

    /// Content outside of any directive
    #[error("unexpected top-level entry '{key}' on line {line}")]
    UnexpectedEntry { key: String, line: usize },

    /// Parsed directive bodies do not line up with the headers in the text
    #[error("found {headers} '{tag}' header(s) but {bodies} directive body(ies)")]
    DirectiveCount {
        tag: String,
        headers: usize,
        bodies: usize,
    },

    /// Canonical rendering failed
    #[error("failed to serialize specification: {0}")]
    Serialize(String),
}

impl SpecfileError {
    /// Violations carried by a validation failure, empty for other kinds
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Structure { violations } | Self::Format { violations } => violations,
            _ => &[],
        }
    }
}

/// Structural grammar errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// No schema file at any search location
    #[error("structural schema not found (searched: {})", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NotFound { searched: Vec<PathBuf> },

    /// Schema file could not be read or parsed
    #[error("invalid structural schema '{path}': {error}")]
    Invalid { path: PathBuf, error: String },
}

/// Failures of external tools the engine relies on
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// Program could not be started
    #[error("failed to run '{program}': {error}")]
    Spawn { program: String, error: String },

    /// Program exited unsuccessfully
    #[error("'{command}' failed with {status}")]
    CommandFailed { command: String, status: String },

    /// Emulation binary required for the target architecture is missing
    #[error("could not find QEMU executable \"{binary}\"")]
    EmulatorNotFound { binary: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove a file or directory
    #[error("Failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write file
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read file
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Failed to change ownership, mode or links
    #[error("Failed to update metadata of '{path}': {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Expected a directory, found a file or symlink
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// A setting without default was not provided
    #[error("No value for '{name}'. Pass --{name} or set it in the [image] config table")]
    MissingValue { name: String },
}

/// Top-level boltroot error type
#[derive(Error, Debug)]
pub enum BoltError {
    /// Invocation error
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Malformed specification
    #[error("malformed specification: {0}")]
    Specfile(#[from] SpecfileError),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Environment or toolchain failure
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure raised by a directive, propagated untouched
    #[error(transparent)]
    Directive(anyhow::Error),
}
