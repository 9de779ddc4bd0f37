//! Boltroot CLI - embedded root filesystem generator
//!
//! Entry point for the boltroot command-line application.

use clap::Parser;

use boltroot::cli::output::display_error;
use boltroot::cli::{Cli, GIT_SHA};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.output().env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("boltroot {} ({GIT_SHA})", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli.run() {
        display_error(&e);
        std::process::exit(1);
    }
}
