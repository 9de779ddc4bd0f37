//! Package feed URLs

/// Base URL of the release archive
pub const REPO_BASE: &str = "http://archive.boltlinux.org/dists";
