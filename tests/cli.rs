use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write a config pointing storage at `dir` and the API at an unused port
fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    let contents = format!(
        "[api]\nbase_url = \"http://127.0.0.1:9\"\n\n[storage]\ndir = {:?}\n\n[logging]\nlevel = \"warn\"\n",
        dir.path().join("data")
    );
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("bfrb")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("track"))
        .stdout(predicate::str::contains("strategies"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn test_instances_help_shows_subcommands() {
    cargo_bin_cmd!("bfrb")
        .args(["instances", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("bfrb")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_catalog_json() {
    let output = cargo_bin_cmd!("bfrb")
        .args(["--json", "catalog"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let categories = catalog.as_array().unwrap();
    assert_eq!(categories.len(), 6);
    assert_eq!(categories[0]["category"], "location");
    assert!(String::from_utf8_lossy(&output.stdout).contains("bedroom"));
}

#[test]
fn test_catalog_unknown_category() {
    cargo_bin_cmd!("bfrb")
        .args(["catalog", "--category", "moods"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("USAGE_ERROR"));
}

#[test]
fn test_status_without_session() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cargo_bin_cmd!("bfrb")
        .arg("--config")
        .arg(&config)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authState\": \"unauthenticated\""))
        .stdout(predicate::str::contains("http://127.0.0.1:9"));
}

#[test]
fn test_protected_commands_require_session() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cargo_bin_cmd!("bfrb")
        .arg("--config")
        .arg(&config)
        .args(["instances", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT_SIGNED_IN"));
}

#[test]
fn test_track_rejects_out_of_range_urge() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cargo_bin_cmd!("bfrb")
        .arg("--config")
        .arg(&config)
        .args(["track", "--urge", "11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VALIDATION_ERROR"));
}

#[test]
fn test_track_rejects_unknown_option() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    cargo_bin_cmd!("bfrb")
        .arg("--config")
        .arg(&config)
        .args(["track", "--emotion", "bedroom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VALIDATION_ERROR"));
}
