//! CLI end-to-end tests

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the vidsync binary
#[allow(deprecated)]
fn vidsync_cmd() -> Command {
    Command::cargo_bin("vidsync").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    vidsync_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    vidsync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vidsync"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_cli_version_command() {
    vidsync_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_validate_valid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        format!(
            "[sync]\nidentity = \"fingerprint\"\n\n[[roots]]\nname = \"Movies\"\npath = {:?}\n",
            dir.path()
        ),
    )
    .unwrap();

    vidsync_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Identity: fingerprint"))
        .stdout(predicate::str::contains("Movies"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[sync]\nworkers = 0\n").unwrap();

    vidsync_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_cli_sync_reports_json() {
    let dir = tempdir().unwrap();
    let media = dir.path().join("media");
    fs::create_dir(&media).unwrap();
    fs::write(media.join("readme.txt"), "not a video").unwrap();

    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[catalog]\nbackend = \"memory\"\n\n[sync]\nthumbnail_dir = {:?}\n\n[[roots]]\nname = \"Media\"\npath = {:?}\n",
            dir.path().join("thumbs"),
            media
        ),
    )
    .unwrap();

    vidsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""))
        .stdout(predicate::str::contains("\"created\": 0"));
}

#[test]
fn test_cli_probe_missing_file() {
    vidsync_cmd()
        .args(["probe", "/nonexistent/video.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
