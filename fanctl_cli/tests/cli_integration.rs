use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Quiet, already-warm simulated enclosure
fn write_warm_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[timing]
tick_ms = 33
watchdog_ms = 2000

[sensor]
backend = "sim"
sim_start_c = 40.0
sim_ramp_c_per_s = 0.0
sim_noise = 0

[fan]
backend = "sim"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_profile(dir: &tempfile::TempDir, csv: &str) -> PathBuf {
    let path = dir.path().join("profile.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn fanctl() -> Command {
    Command::cargo_bin("fanctl").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["simulate"], 2, "required", "stderr")]
#[case(&["run", "--tick-ms", "0"], 1, "tick-ms", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = fanctl().args(args).assert().code(exit_code);
    let out = assert.get_output();
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "missing {needle:?} in {stream}: {text}");
}

#[test]
fn bounded_run_reaches_running() {
    let dir = tempdir().unwrap();
    let cfg = write_warm_config(&dir);
    let out = fanctl()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--max-ticks", "40", "--tick-ms", "1"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["ticks"], 40);
    assert_eq!(v["final_state"], "running");
    assert_eq!(v["resets"], 0);
}

#[test]
fn simulate_emits_one_json_line_per_tick() {
    let dir = tempdir().unwrap();
    let profile = write_profile(&dir, "tick,raw\n0,253\n60,308\n");
    let out = fanctl()
        .arg("--json")
        .arg("simulate")
        .arg("--profile")
        .arg(&profile)
        .args(["--ticks", "200"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 200);
    for key in ["tick", "raw", "average", "state", "duty", "reported"] {
        assert!(lines[0].get(key).is_some(), "missing {key}");
    }
    assert_eq!(lines[0]["state"], "full_speed");
    assert!(lines.iter().any(|l| l["state"] == "off"));
    assert!(lines.iter().any(|l| l["state"] == "startup"));
    let last = lines.last().unwrap();
    assert_eq!(last["state"], "running");
    assert_eq!(last["average"], 305);
    assert_eq!(last["duty"], 127);
    let reports = lines.iter().filter(|l| l["reported"] == true).count();
    assert_eq!(reports, 6);
}

#[test]
fn simulate_pretty_summary() {
    let dir = tempdir().unwrap();
    let profile = write_profile(&dir, "tick,raw\n0,343\n");
    fanctl()
        .arg("simulate")
        .arg("--profile")
        .arg(&profile)
        .assert()
        .success()
        .stdout(predicate::str::contains("simulated 100 ticks"))
        .stdout(predicate::str::contains("final: state=running duty=255"));
}

#[test]
fn simulate_rejects_bad_header() {
    let dir = tempdir().unwrap();
    let profile = write_profile(&dir, "raw,tick\n300,0\n");
    fanctl()
        .arg("simulate")
        .arg("--profile")
        .arg(&profile)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 'tick,raw'"));
}

#[test]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[timing]\ntick_ms = 0\n").unwrap();
    fanctl()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[sensor]\nbackend = \"sysfs\"\nzone = \"/no/such/zone\"\n").unwrap();
    let out = fanctl()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .args(["run", "--max-ticks", "1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Sensor");
}

#[cfg(not(feature = "hardware"))]
#[test]
fn rpi_backend_needs_hardware_build() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rpi.toml");
    fs::write(&path, "[fan]\nbackend = \"rpi\"\n").unwrap();
    fanctl()
        .arg("--config")
        .arg(&path)
        .args(["run", "--max-ticks", "1"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("--features hardware"));
}
