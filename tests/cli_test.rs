//! CLI contract tests: config discovery, init and argument errors

use std::path::Path;
use std::process::{Command, Output};

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_registerscan"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("REGISTERSCAN_CONFIG")
        .output()
        .expect("Failed to run registerscan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_init_then_config_shows_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["init"]);
    assert!(output.status.success());
    assert!(dir.path().join("registerscan.toml").is_file());

    let output = run(dir.path(), &["config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[series]"));
    assert!(text.contains("rapid_days = 1095"));
    assert!(text.contains("stacking_threshold = 3"));
}

#[test]
fn test_config_picks_up_local_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("registerscan.toml"),
        "[procurement]\nbandwidth = 0.03\n",
    )
    .unwrap();
    let text = stdout(&run(dir.path(), &["config"]));
    assert!(text.contains("bandwidth = 0.03"));
    assert!(text.contains("services_threshold = 221000.0"));
}

#[test]
fn test_config_json_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".registerscanrc.json"),
        r#"{"childcare": {"stacking_threshold": 5}}"#,
    )
    .unwrap();
    let text = stdout(&run(dir.path(), &["config"]));
    assert!(text.contains("stacking_threshold = 5"));
}

#[test]
fn test_broken_local_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("registerscan.toml"), "[series\n").unwrap();
    let output = run(dir.path(), &["config"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("z_threshold = 2.0"));
}

#[test]
fn test_broken_explicit_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("custom.toml"), "[series\n").unwrap();
    let output = run(dir.path(), &["--config", "custom.toml", "config"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_explicit_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--config", "absent.toml", "config"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_setting_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ledger.csv"), "x\n").unwrap();
    let output = run(
        dir.path(),
        &["subsidy-trends", "ledger.csv", "--rolling-window", "1", "-o", "out"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("rolling_window"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unknown_log_level_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--log-level", "loud", "config"]);
    assert!(!output.status.success());
}

#[test]
fn test_thresholds_requires_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["thresholds"]);
    assert!(!output.status.success());
}
