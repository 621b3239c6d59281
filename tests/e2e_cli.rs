//! CLI end-to-end tests
//!
//! Tests for the multivision command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the multivision binary
#[allow(deprecated)]
fn multivision_cmd() -> Command {
    Command::cargo_bin("multivision").unwrap()
}

/// Write `segments` two-camera blobs with audio, plus a metadata file.
fn write_recording(dir: &Path, segments: u64) {
    let layout = common::layout(2, true);
    for index in 0..segments {
        fs::write(dir.join(index.to_string()), common::blob(layout, index)).unwrap();
    }
    fs::write(
        dir.join("metadata.json"),
        r#"{"cameraCount": 2, "segmentsPerSecond": 10.0, "freezeTimeDelay": 0.02}"#,
    )
    .unwrap();
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = multivision_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = multivision_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("multivision"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = multivision_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multivision.toml");
    fs::write(&path, "[stream]\ncamera_count = 6\nend_segment = 90\n").unwrap();

    let mut cmd = multivision_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Cameras: 6"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multivision.toml");
    fs::write(&path, "[cache]\ncache_purge_interval = 0.0\n").unwrap();

    let mut cmd = multivision_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("purge interval"));
}

#[test]
fn test_cli_pack_then_inspect() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("front"), b"front-view").unwrap();
    fs::write(dir.path().join("side"), b"side").unwrap();
    fs::write(dir.path().join("audio"), b"aac").unwrap();
    let blob = dir.path().join("0");

    let mut cmd = multivision_cmd();
    cmd.current_dir(dir.path())
        .args(["pack", "--out", "0", "front", "side", "--audio", "audio"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 cameras + audio"));
    assert_eq!(fs::metadata(&blob).unwrap().len(), 12 + 10 + 4 + 3);

    let mut cmd = multivision_cmd();
    cmd.arg("inspect")
        .arg(&blob)
        .args(["--cameras", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Declared lengths: [10, 4, 3]"))
        .stdout(predicate::str::contains("audio"));

    let mut cmd = multivision_cmd();
    cmd.arg("inspect")
        .arg(&blob)
        .args(["--cameras", "2", "--extract", "2"])
        .assert()
        .success()
        .stdout("side");
}

#[test]
fn test_cli_inspect_rejects_truncated_blob() {
    let dir = tempdir().unwrap();
    let blob = dir.path().join("0");
    fs::write(&blob, [4u8, 0, 0]).unwrap();

    let mut cmd = multivision_cmd();
    cmd.arg("inspect")
        .arg(&blob)
        .args(["--cameras", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_cli_simulate_requires_a_data_name() {
    let dir = tempdir().unwrap();

    let mut cmd = multivision_cmd();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .args(["simulate", "--seconds", "0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please input data name!"));
}

#[test]
fn test_cli_simulate_local_directory() {
    let dir = tempdir().unwrap();
    write_recording(dir.path(), 6);

    let mut cmd = multivision_cmd();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("simulate")
        .arg("--dir")
        .arg(dir.path())
        .args(["--seconds", "1", "--tick-ms", "50", "--switch-every-ms", "300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 cameras"))
        .stdout(predicate::str::contains("Caching completed: true"))
        .stdout(predicate::str::contains("Complete: true"));
}
