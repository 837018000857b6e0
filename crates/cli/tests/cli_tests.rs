//! CLI integration tests

use std::process::Command;

fn pmctl(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_pmctl"))
        .args(args)
        .output()
        .expect("Failed to execute command");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let (success, stdout, _) = pmctl(&["--help"]);

    assert!(success, "CLI help should succeed");
    assert!(stdout.contains("performance monitor"), "Should show app description");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("report"), "Should show report command");
    assert!(stdout.contains("anomalies"), "Should show anomalies command");
    assert!(stdout.contains("warnings"), "Should show warnings command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let (success, stdout, _) = pmctl(&["--version"]);

    assert!(success, "CLI version should succeed");
    assert!(stdout.contains("pmctl"), "Should show binary name");
}

/// Test anomalies subcommand help
#[test]
fn test_anomalies_help() {
    let (success, stdout, _) = pmctl(&["anomalies", "--help"]);

    assert!(success, "anomalies help should succeed");
    assert!(stdout.contains("--limit"), "Should show limit option");
    assert!(stdout.contains("--type"), "Should show type filter");
    assert!(stdout.contains("memory-leak"), "Should list anomaly types");
}

/// Test that an unknown anomaly type is rejected
#[test]
fn test_invalid_anomaly_type() {
    let (success, _, stderr) = pmctl(&["anomalies", "--type", "cpu-spike"]);

    assert!(!success, "Unknown anomaly type should fail");
    assert!(stderr.contains("invalid value"), "Should explain the rejection");
}

/// Test that an unreachable agent yields a failure rather than a panic
#[test]
fn test_unreachable_agent_fails() {
    let (success, _, stderr) = pmctl(&["--api-url", "http://127.0.0.1:1", "status"]);

    assert!(!success, "Unreachable agent should fail");
    assert!(stderr.contains("Error"), "Should report an error");
}
