//! Output formatting and log level selection
//!
//! Status lines go to stdout, diagnostics go to stderr through `tracing`.

use tracing_subscriber::EnvFilter;

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// User-facing output settings derived from the global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Number of `-v` flags
    pub verbose: u8,
}

impl OutputConfig {
    /// Create output settings from the command-line flags
    #[must_use]
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self { quiet, verbose }
    }

    /// Default log level for these flags
    #[must_use]
    pub fn level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// Log filter; `RUST_LOG` wins over the flags when set
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().to_string()))
    }

    /// Print a success line unless quiet
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {message}", status::SUCCESS);
        }
    }

    /// Print an informational line unless quiet
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {message}", status::INFO);
        }
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_warn() {
        assert_eq!(OutputConfig::default().level(), tracing::Level::WARN);
    }

    #[test]
    fn test_verbose_levels() {
        assert_eq!(OutputConfig::new(false, 1).level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, 2).level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(false, 5).level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        assert_eq!(OutputConfig::new(true, 2).level(), tracing::Level::ERROR);
    }
}
