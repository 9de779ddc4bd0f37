//! Package version identifiers and constraints
//!
//! Versions follow the `[epoch:]version[-revision]` layout used by the
//! package feeds. Constraints pair a relational operator with a version:
//!
//! - `<<` strictly older
//! - `<=` older or equal
//! - `=` equal
//! - `>=` newer or equal
//! - `>>` strictly newer
//!
//! The bare string `==` is a sentinel accepting any version; the actual
//! match is deferred to resolution time.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Pattern for `OP [EPOCH:] VERSION [-REVISION]`
pub const CONSTRAINT_PATTERN: &str =
    r"^(<<|<=|=|>=|>>)\s*(?:([0-9]+):)?([-.+~a-zA-Z0-9]+?)(?:-([.~+a-zA-Z0-9]+))?$";

/// Pattern for `[EPOCH:] VERSION [-REVISION]`
pub const IDENTIFIER_PATTERN: &str =
    r"^(?:([0-9]+):)?([-.+~a-zA-Z0-9]+?)(?:-([.~+a-zA-Z0-9]+))?$";

/// The literal accepting any version
pub const ANY_VERSION: &str = "==";

/// Errors related to version parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid version constraint format
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// Invalid version format
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

fn constraint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CONSTRAINT_PATTERN).expect("constraint pattern is valid"))
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// Relational operator of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `>=`
    GreaterOrEqual,
    /// `>>`
    Greater,
}

impl Operator {
    /// Textual form of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">>",
        }
    }

    /// Whether `ordering` (candidate compared to the bound) satisfies the operator
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::Greater => ordering == Ordering::Greater,
        }
    }
}

impl FromStr for Operator {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<<" => Ok(Self::Less),
            "<=" => Ok(Self::LessOrEqual),
            "=" => Ok(Self::Equal),
            ">=" => Ok(Self::GreaterOrEqual),
            ">>" => Ok(Self::Greater),
            other => Err(VersionError::InvalidConstraint {
                constraint: other.to_string(),
                reason: "unknown relational operator".to_string(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version as `(epoch, upstream version, revision)`
///
/// Equality follows the ordering, so `1.0` and `1.00` compare equal.
#[derive(Debug, Clone)]
pub struct VersionIdentifier {
    epoch: Option<u64>,
    upstream: String,
    revision: Option<String>,
}

impl VersionIdentifier {
    /// Build an identifier from its parts
    pub fn new(epoch: Option<u64>, upstream: &str, revision: Option<&str>) -> Self {
        Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.map(ToString::to_string),
        }
    }

    /// Parse `[epoch:]version[-revision]`; the rightmost `-` starts the revision
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let caps = identifier_regex()
            .captures(version)
            .ok_or_else(|| VersionError::InvalidVersion {
                version: version.to_string(),
                reason: format!("does not match '{IDENTIFIER_PATTERN}'"),
            })?;

        let epoch = caps
            .get(1)
            .map(|m| parse_epoch(m.as_str(), version))
            .transpose()?;

        Ok(Self {
            epoch,
            upstream: caps[2].to_string(),
            revision: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Epoch, if given explicitly
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Upstream version
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Packaging revision, if any
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

fn parse_epoch(epoch: &str, version: &str) -> Result<u64, VersionError> {
    epoch.parse().map_err(|_| VersionError::InvalidVersion {
        version: version.to_string(),
        reason: format!("epoch '{epoch}' is out of range"),
    })
}

impl FromStr for VersionIdentifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{epoch}:")?;
        }
        f.write_str(&self.upstream)?;
        if let Some(revision) = &self.revision {
            write!(f, "-{revision}")?;
        }
        Ok(())
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .unwrap_or(0)
            .cmp(&other.epoch.unwrap_or(0))
            .then_with(|| compare_fragment(&self.upstream, &other.upstream))
            .then_with(|| {
                compare_fragment(
                    self.revision.as_deref().unwrap_or(""),
                    other.revision.as_deref().unwrap_or(""),
                )
            })
    }
}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionIdentifier {}

/// Weight of a non-digit character: `~` sorts before the end of the
/// string, letters before everything else.
fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// Compare upstream versions or revisions by alternating non-digit and digit runs.
fn compare_fragment(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());

    while !a.is_empty() || !b.is_empty() {
        loop {
            let ca = a.first().copied().filter(|c| !c.is_ascii_digit());
            let cb = b.first().copied().filter(|c| !c.is_ascii_digit());
            if ca.is_none() && cb.is_none() {
                break;
            }
            let ordering = char_order(ca).cmp(&char_order(cb));
            if ordering != Ordering::Equal {
                return ordering;
            }
            a = &a[1..];
            b = &b[1..];
        }

        let (digits_a, rest_a) = split_digits(a);
        let (digits_b, rest_b) = split_digits(b);
        let ordering = compare_digits(digits_a, digits_b);
        if ordering != Ordering::Equal {
            return ordering;
        }
        a = rest_a;
        b = rest_b;
    }

    Ordering::Equal
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn compare_digits(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
    let a = &a[trim(a)..];
    let b = &b[trim(b)..];
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// A versioned dependency requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// `OP version`
    Relation {
        operator: Operator,
        version: VersionIdentifier,
    },
    /// `==`, any version
    Any,
}

impl VersionConstraint {
    /// Parse a constraint, accepting the `==` sentinel
    pub fn parse(constraint: &str) -> Result<Self, VersionError> {
        if constraint == ANY_VERSION {
            return Ok(Self::Any);
        }
        Self::parse_strict(constraint)
    }

    /// Parse a constraint that must carry an operator and a version
    pub fn parse_strict(constraint: &str) -> Result<Self, VersionError> {
        let caps = constraint_regex()
            .captures(constraint)
            .ok_or_else(|| VersionError::InvalidConstraint {
                constraint: constraint.to_string(),
                reason: format!("does not match '{CONSTRAINT_PATTERN}'"),
            })?;

        let operator = caps[1].parse()?;
        let epoch = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .parse()
                    .map_err(|_| VersionError::InvalidConstraint {
                        constraint: constraint.to_string(),
                        reason: format!("epoch '{}' is out of range", m.as_str()),
                    })
            })
            .transpose()?;

        Ok(Self::Relation {
            operator,
            version: VersionIdentifier {
                epoch,
                upstream: caps[3].to_string(),
                revision: caps.get(4).map(|m| m.as_str().to_string()),
            },
        })
    }

    /// Check whether `candidate` satisfies the constraint
    pub fn matches(&self, candidate: &VersionIdentifier) -> bool {
        match self {
            Self::Any => true,
            Self::Relation { operator, version } => operator.accepts(candidate.cmp(version)),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(ANY_VERSION),
            Self::Relation { operator, version } => write!(f, "{operator} {version}"),
        }
    }
}

/// Compose `[epoch:]version[-revision]`, leaving out empty parts
pub fn compose_version(epoch: Option<&str>, version: &str, revision: Option<&str>) -> String {
    let mut composed = String::new();
    if let Some(epoch) = epoch.filter(|e| !e.is_empty()) {
        composed.push_str(epoch);
        composed.push(':');
    }
    composed.push_str(version);
    if let Some(revision) = revision.filter(|r| !r.is_empty()) {
        composed.push('-');
        composed.push_str(revision);
    }
    composed
}
