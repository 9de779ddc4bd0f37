//! Integration tests for the `boltroot` command line
//!
//! Runs the built binary against temporary workspaces. The global config
//! directory is pointed at an empty temporary directory so the user's own
//! configuration never leaks in.

mod common;

use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::{Command, Output};

use common::{TestSysroot, SAMPLE_SPECFILE};

/// Helper to run boltroot with an isolated config directory
fn run_boltroot(config_dir: &assert_fs::TempDir, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_boltroot"));
    cmd.env("BOLT_CONFIG_DIR", config_dir.path());
    cmd.env_remove("RUST_LOG");
    for arg in args {
        cmd.arg(arg);
    }
    cmd.output().expect("Failed to execute boltroot")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ============================================
// validate
// ============================================

#[test]
fn test_validate_reports_name_and_version() {
    let config = assert_fs::TempDir::new().unwrap();
    let spec = config.child("specfile.toml");
    spec.write_str(SAMPLE_SPECFILE).unwrap();

    let output = run_boltroot(&config, &["validate", spec.path().to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(predicate::str::contains("hello 1:2.3-4 is valid").eval(&stdout(&output)));
}

#[test]
fn test_validate_quiet_prints_nothing() {
    let config = assert_fs::TempDir::new().unwrap();
    let spec = config.child("specfile.toml");
    spec.write_str(SAMPLE_SPECFILE).unwrap();

    let output = run_boltroot(&config, &["-q", "validate", spec.path().to_str().unwrap()]);

    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_validate_serialize_prints_json() {
    let config = assert_fs::TempDir::new().unwrap();
    let spec = config.child("specfile.toml");
    spec.write_str(SAMPLE_SPECFILE).unwrap();

    let output = run_boltroot(
        &config,
        &["validate", "--serialize", spec.path().to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let document: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(document["name"], "control");
}

#[test]
fn test_validate_lists_format_errors() {
    let config = assert_fs::TempDir::new().unwrap();
    let spec = config.child("specfile.toml");
    spec.write_str(&SAMPLE_SPECFILE.replace("jane@example.org", "jane"))
        .unwrap();

    let output = run_boltroot(&config, &["validate", spec.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(predicate::str::contains("format errors").eval(&err));
    assert!(predicate::str::contains("* release/@email on line").eval(&err));
}

#[test]
fn test_validate_missing_file() {
    let config = assert_fs::TempDir::new().unwrap();
    let missing = config.child("absent.toml");

    let output = run_boltroot(&config, &["validate", missing.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("no such file").eval(&stderr(&output)));
}

// ============================================
// Image commands
// ============================================

#[test]
fn test_prepare_requires_release() {
    let config = assert_fs::TempDir::new().unwrap();
    let sysroot = TestSysroot::new();

    let output = run_boltroot(&config, &["prepare", sysroot.root().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("No value for 'release'").eval(&stderr(&output)));
}

#[test]
fn test_prepare_missing_directory() {
    let config = assert_fs::TempDir::new().unwrap();
    let sysroot = TestSysroot::new();
    let missing = sysroot.path().join("absent");

    let output = run_boltroot(
        &config,
        &["prepare", "--release", "zeus", missing.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("no such directory").eval(&stderr(&output)));
}

#[test]
fn test_release_from_config_file() {
    let config = assert_fs::TempDir::new().unwrap();
    config
        .child("config.toml")
        .write_str("[image]\nrelease = \"zeus\"\n")
        .unwrap();
    let sysroot = TestSysroot::new();
    let missing = sysroot.path().join("absent");

    let output = run_boltroot(&config, &["cleanup", missing.to_str().unwrap()]);

    // Release resolved from the file, so the failure is about the root
    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("no such directory").eval(&stderr(&output)));
}

#[test]
fn test_customize_applies_image() {
    let config = assert_fs::TempDir::new().unwrap();
    let sysroot = TestSysroot::new();
    let image = sysroot.create_file("image.toml", common::SAMPLE_IMAGE);

    let output = run_boltroot(
        &config,
        &[
            "customize",
            "--release",
            "zeus",
            sysroot.root().to_str().unwrap(),
            image.to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(sysroot.read_root_file("etc/motd"), "welcome\n");
}

#[test]
fn test_customize_unknown_directive() {
    let config = assert_fs::TempDir::new().unwrap();
    let sysroot = TestSysroot::new();
    let image = sysroot.create_file("image.toml", "[[mkdir]]\npath = \"a\"\n[[chown]]\npath = \"a\"\n");

    let output = run_boltroot(
        &config,
        &[
            "customize",
            "--release",
            "zeus",
            sysroot.root().to_str().unwrap(),
            image.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(predicate::str::contains("unknown directive 'chown' on line 3").eval(&stderr(&output)));
    assert!(!sysroot.root_has("a"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let config = assert_fs::TempDir::new().unwrap();
    config.child("config.toml").write_str("[image\n").unwrap();
    let sysroot = TestSysroot::new();

    let output = run_boltroot(&config, &["cleanup", sysroot.root().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
}
