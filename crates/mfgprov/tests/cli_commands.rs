#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mfgprov-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn mfgprov(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mfgprov"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("MFGPROV_PORT")
        .output()
        .expect("mfgprov should run")
}

#[test]
fn version_prints_package_version() {
    let output = mfgprov(&["version"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("mfgprov {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn inspect_reports_verified_frames() {
    let dir = unique_temp_dir("inspect-ok");
    let capture = dir.join("good.bin");
    std::fs::write(
        &capture,
        [0x03, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x06, 0x00, 0x00, 0x00],
    )
    .expect("capture should be writable");

    let output = mfgprov(&["--format", "json", "inspect", capture.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("inspect output should be JSON");
    assert_eq!(report["frames"][0]["length"], 3);
    assert_eq!(report["frames"][0]["declared_checksum"], 6);
    assert_eq!(report["frames"][0]["verified"], true);
    assert_eq!(report["trailing_bytes"], 0);
    assert!(report["error"].is_null());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn inspect_flags_checksum_mismatch() {
    let dir = unique_temp_dir("inspect-bad");
    let capture = dir.join("bad.bin");
    std::fs::write(
        &capture,
        [0x02, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFD, 0x01, 0x00, 0x00],
    )
    .expect("capture should be writable");

    let output = mfgprov(&["--format", "json", "inspect", capture.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("inspect output should be JSON");
    assert_eq!(report["frames"][0]["declared_checksum"], 509);
    assert_eq!(report["frames"][0]["computed_checksum"], 510);
    assert_eq!(report["frames"][0]["verified"], false);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn inspect_missing_file_fails() {
    let dir = unique_temp_dir("inspect-missing");
    let missing = dir.join("absent.bin");

    let output = mfgprov(&["inspect", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed reading"));

    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn run_reports_unopenable_port() {
    let dir = unique_temp_dir("run-open");
    let port = dir.join("ttyMISSING");

    let output = mfgprov(&["run", "--port", port.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("open failed"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn run_requires_port() {
    let output = mfgprov(&["run"]);
    assert_eq!(output.status.code(), Some(2));
}
