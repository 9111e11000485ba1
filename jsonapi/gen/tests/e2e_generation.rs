//! End-to-end tests: generate a package and verify it compiles.
//!
//! These tests are slower than unit tests since they invoke cargo on a
//! scratch crate holding the generated file.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

use jsonapi_gen::output::write_atomic;
use jsonapi_gen::{Generator, Package};

const SCRATCH_MANIFEST: &str = r#"[package]
name = "articles"
version = "0.0.0"
edition = "2024"

[dependencies]
chrono = { version = "0.4", features = ["serde"] }
metrics = "0.24"
serde = { version = "1.0", features = ["derive"] }
serde_json = "1.0"
thiserror = "2.0"
tracing = "0.1"

[workspace]
"#;

fn write_scratch_crate(dir: &TempDir) -> PathBuf {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/articles.yaml");
    let source = Generator::new()
        .build_source(&fixture.display().to_string(), &Package::from_name("articles"))
        .expect("Failed to generate code");

    let crate_dir = dir.path().join("articles");
    write_atomic(&crate_dir.join("src/lib.rs"), &source).expect("Failed to write lib.rs");
    fs::write(crate_dir.join("Cargo.toml"), SCRATCH_MANIFEST).expect("Failed to write Cargo.toml");
    crate_dir
}

fn run_cargo(crate_dir: &PathBuf, args: &[&str]) {
    let output = Command::new("cargo")
        .args(args)
        .arg("--manifest-path")
        .arg(crate_dir.join("Cargo.toml"))
        .output()
        .expect("Failed to run cargo");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!(
            "Generated code failed `cargo {}`:\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            args.join(" "),
            stdout,
            stderr
        );
    }
}

/// Tests that the generated package compiles against its runtime crates.
#[test]
#[ignore = "slow: compiles generated code"]
fn generated_code_compiles() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let crate_dir = write_scratch_crate(&temp_dir);
    run_cargo(&crate_dir, &["check"]);
}
