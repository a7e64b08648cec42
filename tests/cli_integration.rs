#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_oxibps").to_string()
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn cli_apply_fixture() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("frowny.txt");

    let st = Command::new(bin())
        .args(["apply", "--source"])
        .arg(fixture("smiley.txt"))
        .arg(fixture("smiley-to-frowny.bps"))
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(fixture("frowny.txt")).unwrap()
    );
}

#[test]
fn cli_apply_to_stdout_with_json_stats() {
    let out = Command::new(bin())
        .args(["--json", "apply", "-c", "-s"])
        .arg(fixture("smiley.txt"))
        .arg(fixture("smiley-to-frowny.bps"))
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(out.stdout, std::fs::read(fixture("frowny.txt")).unwrap());

    let stats: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(stats["command"], "apply");
    assert_eq!(stats["output_size"], 98);
    assert!(stats["commands"]["target_copy"].as_u64().unwrap() > 0);
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.txt");
    std::fs::write(&output, b"keep me").unwrap();

    let apply = |force: bool| {
        let mut cmd = Command::new(bin());
        if force {
            cmd.arg("--force");
        }
        cmd.args(["apply", "--source"])
            .arg(fixture("smiley.txt"))
            .arg(fixture("smiley-to-frowny.bps"))
            .arg(&output)
            .status()
            .unwrap()
    };

    assert!(!apply(false).success());
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");
    assert!(apply(true).success());
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(fixture("frowny.txt")).unwrap()
    );
}

#[test]
fn cli_wrong_source_fails_without_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let out = Command::new(bin())
        .args(["apply", "--source"])
        .arg(fixture("frowny.txt"))
        .arg(fixture("smiley-to-frowny.bps"))
        .arg(&output)
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("source CRC32 mismatch"), "stderr: {stderr}");
    assert!(!output.exists());
}

#[test]
fn cli_check_only() {
    let st = Command::new(bin())
        .args(["apply", "--check-only", "--source"])
        .arg(fixture("smiley.txt"))
        .arg(fixture("smiley-to-frowny.bps"))
        .status()
        .unwrap();
    assert!(st.success());
}

#[test]
fn cli_header_prints_sizes_and_checksums() {
    let out = Command::new(bin())
        .arg("header")
        .arg(fixture("smiley-to-frowny.bps"))
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("BPS source size:              98"));
    assert!(stdout.contains("BPS target size:              98"));
    assert!(stdout.contains("smiley to frowny"));
    assert!(stdout.contains("(ok)"));
}

#[test]
fn cli_commands_lists_every_opcode() {
    let out = Command::new(bin())
        .arg("commands")
        .arg(fixture("smiley-to-frowny.bps"))
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for name in ["sourceRead", "targetRead", "sourceCopy", "targetCopy"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn cli_rejects_non_bps_file() {
    let out = Command::new(bin())
        .arg("header")
        .arg(fixture("smiley.txt"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("oxibps: invalid BPS patch"));
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
}
