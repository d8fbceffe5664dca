use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn buildcheck() -> Command {
    let mut cmd = Command::cargo_bin("buildcheck").expect("binary present");
    cmd.env("RUST_LOG", "warn");
    cmd
}

const MISSING_COMPILER_CONFIG: &str = "\
project:
  name: basic
  root: .
compiler:
  program: buildcheck-missing-compiler-9c1e
";

#[test]
fn init_writes_a_config_that_validates() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("buildcheck.yaml");

    buildcheck()
        .current_dir(temp.path())
        .args(["init", "--output"])
        .arg(&config)
        .assert()
        .success();

    let content = fs::read_to_string(&config).unwrap();
    assert!(content.contains("wasm32-unknown-unknown"));
    assert!(content.contains("externref"));

    buildcheck().arg("validate").arg(&config).assert().success();

    buildcheck()
        .args(["init", "--output"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn validate_rejects_empty_project_name() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("bad.yaml");
    fs::write(&config, "project:\n  name: ''\n").unwrap();

    buildcheck().arg("validate").arg(&config).assert().failure();
}

#[test]
fn rules_lists_the_builtin_defect() {
    let output = buildcheck().arg("rules").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("'externref' -> known external-tool defect"));
}

#[test]
fn run_reports_missing_compiler_and_still_summarises() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("buildcheck.yaml");
    fs::write(&config, MISSING_COMPILER_CONFIG).unwrap();
    let report_path = temp.path().join("out").join("report.json");

    let output = buildcheck()
        .args(["run", "--config"])
        .arg(&config)
        .arg("--report-json")
        .arg(&report_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("1. Testing Rust compilation..."));
    assert!(stdout.contains("❌ Rust compilation: FAILED"));
    assert!(stdout.contains("buildcheck-missing-compiler-9c1e"));
    assert!(stdout.contains("3. Summary"));
    assert!(stdout.contains("✅ Rust edition: 2021"));
    assert!(stdout.contains("❌ Compilation: FAILED"));
    assert!(stdout.contains("WASM binding: NOT ATTEMPTED (compilation failed)"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let statuses: Vec<_> = json["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stage| stage["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["failure", "skipped", "skipped"]);
}

#[test]
fn strict_run_fails_when_a_stage_fails() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("buildcheck.yaml");
    fs::write(&config, MISSING_COMPILER_CONFIG).unwrap();

    buildcheck()
        .args(["run", "--strict", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn project_root_flag_replaces_configured_root() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("buildcheck.yaml");
    // `sh build --target ...` runs the `build` script found in the working directory.
    fs::write(&config, "project:\n  name: basic\n  root: .\ncompiler:\n  program: sh\n").unwrap();
    let override_root = temp.path().join("override");
    fs::create_dir_all(&override_root).unwrap();
    fs::write(override_root.join("build"), "pwd > ran-here\n").unwrap();

    let output = buildcheck()
        .args(["run", "--config"])
        .arg(&config)
        .arg("--project-root")
        .arg(&override_root)
        .output()
        .unwrap();
    assert!(output.status.success());

    assert!(override_root.join("ran-here").exists());
    assert!(!temp.path().join("ran-here").exists());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("✅ Rust compilation: SUCCESS"));
    assert!(stdout.contains("❌ WASM file: FAILED"));
    assert!(stdout.contains(&override_root.display().to_string()));
}
