//! CLI end-to-end tests
//!
//! Tests for the batchjpg command-line interface. None of these need `cjpeg`:
//! they exercise argument handling, startup errors and dry runs.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the batchjpg binary
#[allow(deprecated)]
fn batchjpg_cmd() -> Command {
    let mut cmd = Command::cargo_bin("batchjpg").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"png").unwrap();
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = batchjpg_cmd();
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--delete-original"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = batchjpg_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("batchjpg"))
        .stdout(predicate::str::contains("--exclude"))
        .stdout(predicate::str::contains("Examples"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = batchjpg_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("batchjpg"));
}

#[test]
fn test_cli_missing_root_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = batchjpg_cmd();
    cmd.arg(dir.path().join("does-not-exist"))
        .arg("--dry-run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Root directory does not exist"));
}

#[test]
fn test_cli_root_that_is_a_file_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.png");
    fs::write(&file, b"png").unwrap();

    let mut cmd = batchjpg_cmd();
    cmd.arg(&file)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_cli_invalid_quality_rejected() {
    let dir = tempdir().unwrap();
    let mut cmd = batchjpg_cmd();
    cmd.arg(dir.path())
        .args(["--quality", "0", "--dry-run"])
        .assert()
        .failure();
}

#[test]
fn test_cli_dry_run_lists_eligible_files_only() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.png");
    touch(dir.path(), "sub/c.png");
    touch(dir.path(), "keep/d.PNG");
    touch(dir.path(), ".hidden/e.png");
    touch(dir.path(), "node_modules/f.png");
    touch(dir.path(), "b.txt");

    let mut cmd = batchjpg_cmd();
    let assert = cmd
        .arg(dir.path())
        .args(["--dry-run", "--exclude=sub"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.png ->"))
        .stdout(predicate::str::contains("a.jpg"))
        .stdout(predicate::str::contains("d.jpg"))
        .stdout(predicate::str::contains("c.png").not())
        .stdout(predicate::str::contains("e.png").not())
        .stdout(predicate::str::contains("f.png").not())
        .stdout(predicate::str::contains("b.txt").not());

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 2);

    // Nothing was converted or deleted.
    assert!(dir.path().join("a.png").exists());
    assert!(!dir.path().join("a.jpg").exists());
}

#[test]
fn test_cli_bad_config_file_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("batchjpg.toml");
    fs::write(&config, "[scan]\nmax_files_per_batch = 0\n").unwrap();

    let mut cmd = batchjpg_cmd();
    cmd.arg(dir.path())
        .arg("--dry-run")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_files_per_batch"));
}

#[test]
fn test_cli_missing_cjpeg_fails_at_startup() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.png");
    let config = dir.path().join("batchjpg.toml");
    fs::write(
        &config,
        "[conversion]\ncjpeg_path = \"/nonexistent/cjpeg\"\n",
    )
    .unwrap();

    let mut cmd = batchjpg_cmd();
    cmd.arg(dir.path())
        .arg("--config")
        .arg(&config)
        // Hide any system cjpeg so discovery fails.
        .env("PATH", dir.path().join("empty-bin"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cjpeg"));

    assert!(dir.path().join("a.png").exists());
}
