//! Infrastructure layer
//!
//! Handles I/O against the host: filesystem, external processes and
//! platform directories.

pub mod dirs;
pub mod filesystem;
pub mod host;
