//! End-to-end tests for the `kite-cli` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_input(dir: &Path, source: &str) -> PathBuf {
    let input_path = dir.join("input.kite");
    fs::write(&input_path, source).expect("write input");
    input_path
}

#[test]
fn compiles_and_runs_wasm() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 { max(1, 3) }");
    let output_path = dir.path().join("out/main.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .arg("build")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Program exited with 3"));

    assert!(output_path.exists(), "wasm output was not created");
}

#[test]
fn runs_host_printing() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(
        dir.path(),
        "fn main() { print_str(\"hello\"); print_i32(abs(-42)); }",
    );
    let output_path = dir.path().join("out.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .arg("build")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--run")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello\n42\nProgram exited"));
}

#[test]
fn answers_hover_queries() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 {\n    let answer = 42;\n    answer\n}");
    let output_path = dir.path().join("out.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .args(["build", "--input"])
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .args(["hover", "--module"])
        .arg(&output_path)
        .args(["--line", "2", "--character", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("let answer: i32"));
}

#[test]
fn builds_without_metadata() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 { let v = 1; v }");
    let output_path = dir.path().join("out.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .args(["build", "--no-metadata", "--memory-pages", "2", "--input"])
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .args(["hover", "--module"])
        .arg(&output_path)
        .args(["--line", "0", "--character", "23"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no hover information"));
}

#[test]
fn supports_custom_stdlib_root() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 { twice(21) }");
    let output_path = dir.path().join("out.wasm");

    let stdlib_root = dir.path().join("stdlib");
    fs::create_dir_all(&stdlib_root).expect("create stdlib root");
    fs::write(stdlib_root.join("std.kite"), "fn twice(x: i32) -> i32 { x * 2 }")
        .expect("write stdlib");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .arg("build")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--std")
        .arg(&stdlib_root)
        .arg("--run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Program exited with 42"));
}

#[test]
fn reports_missing_stdlib_root() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 { 1 }");
    let output_path = dir.path().join("out.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .arg("build")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--std")
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("standard library directory was not found"));
}

#[test]
fn reports_located_diagnostics() {
    let dir = tempdir().expect("tempdir");
    let input_path = write_input(dir.path(), "fn main() -> i32 {\n    missing\n}");
    let output_path = dir.path().join("out.wasm");

    Command::cargo_bin("kite-cli")
        .expect("binary exists")
        .arg("build")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("input.kite:2:5: error[E0200]"));

    assert!(!output_path.exists(), "failed build wrote output");
}
