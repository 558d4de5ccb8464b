//! Integration tests for the CLI
//!
//! Tests the apply, check and list commands against the seed fixtures

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_seed-patcher"));
    cmd.env("NO_COLOR", "1");
    cmd
}

fn patches() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/patches")
}

/// Helper to create a temp dir holding the baseline seed
fn setup_workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("seed.sql");
    fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/seed-e2e-tests.sql"),
        &input,
    )
    .unwrap();
    (dir, input)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_apply_help() {
    let output = bin().args(["apply", "--help"]).output().unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("Apply patch sets to a file"));
}

#[test]
fn test_apply_writes_sibling_output() {
    let (dir, input) = setup_workspace();

    let output = bin()
        .arg("apply")
        .arg("--input")
        .arg(&input)
        .arg("--patches")
        .arg(patches())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Loaded seed-e2e-fixes@1.0.0 (7 rules)"));
    assert!(out.contains("seed-e2e-fixes/admin-password-hash: applied 2 replacements"));
    assert!(out.contains("Summary:"));
    assert!(out.contains("Wrote"));

    let expected = fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/seed-e2e-tests.expected.sql"),
    )
    .unwrap();
    let patched = fs::read_to_string(dir.path().join("seed.sql.patched")).unwrap();
    assert_eq!(patched, expected);
}

#[test]
fn test_apply_in_place_twice() {
    let (dir, input) = setup_workspace();

    let first = bin()
        .arg("apply")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(patches())
        .arg("--in-place")
        .output()
        .unwrap();
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert!(dir.path().join("seed.sql.orig").exists());
    let after_first = fs::read_to_string(&input).unwrap();

    let second = bin()
        .arg("apply")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(patches())
        .arg("--in-place")
        .output()
        .unwrap();
    assert!(second.status.success());
    assert!(stdout(&second).contains("already applied"));
    assert!(stdout(&second).contains("nothing written"));
    assert_eq!(fs::read_to_string(&input).unwrap(), after_first);
}

#[test]
fn test_apply_dry_run_with_diff() {
    let (dir, input) = setup_workspace();

    let output = bin()
        .arg("apply")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(patches())
        .args(["--dry-run", "--diff"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("DRY RUN"));
    assert!(out.contains("+-- patched-by seed-e2e-fixes@1.0.0"));
    assert!(out.contains("Would write"));
    assert!(!dir.path().join("seed.sql.patched").exists());
}

#[test]
fn test_apply_strict_fails_on_zero_matches() {
    let (dir, input) = setup_workspace();
    fs::write(&input, "SELECT 1;\n").unwrap();
    let set = dir.path().join("one.toml");
    fs::write(
        &set,
        r#"
[meta]
name = "one"

[[rules]]
id = "strip-null"
kind = "regex"
pattern = ", NULL\\)"
replacement = ")"
"#,
    )
    .unwrap();

    let output = bin()
        .arg("apply")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(&set)
        .arg("--strict")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("one/strip-null"));
    assert!(!dir.path().join("seed.sql.patched").exists());
}

#[test]
fn test_apply_missing_input() {
    let dir = TempDir::new().unwrap();

    let output = bin()
        .arg("apply")
        .arg("-i")
        .arg(dir.path().join("missing.sql"))
        .arg("-p")
        .arg(patches())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("File not found"));
}

#[test]
fn test_check_flags_drift() {
    let (_dir, input) = setup_workspace();
    let seed = fs::read_to_string(&input).unwrap();
    fs::write(
        &input,
        seed.replace("INSERT INTO activity_feed (id,", "INSERT INTO activity_feed(id,"),
    )
    .unwrap();

    let output = bin()
        .arg("check")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(patches())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("seed-e2e-fixes/activity-feed-columns"));
    assert!(err.contains("matched zero times"));
}

#[test]
fn test_check_clean_baseline() {
    let (_dir, input) = setup_workspace();

    let output = bin()
        .arg("check")
        .arg("-i")
        .arg(&input)
        .arg("-p")
        .arg(patches())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn test_list() {
    let output = bin().arg("list").arg("-p").arg(patches()).output().unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("seed-e2e-fixes"));
    assert!(out.contains("participants-drop-status-values [regex-replace]"));
    assert!(out.contains("admin-password-hash [literal-replace]"));
}
