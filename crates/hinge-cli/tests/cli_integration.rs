//! Integration tests for the hinge CLI.
//!
//! Run with: `cargo test --package hinge-cli --test cli_integration`

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Helper to run the hinge CLI against a data directory.
fn run_hinge(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hinge"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("HINGE_ENGINE_CONFIG")
        .output()
        .expect("Failed to execute hinge command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Data dir with the sample campaign created as `wren`.
fn with_campaign() -> TempDir {
    let dir = TempDir::new().unwrap();
    let output = run_hinge(dir.path(), &["new", "wren"]);
    assert!(output.status.success(), "new failed: {}", stderr(&output));
    dir
}

const RISKY: &str =
    r#"{"type":"travel","destination":"market","approach":{"type":"risky_traversal"}}"#;

// =============================================================================
// Basic commands
// =============================================================================

#[test]
fn test_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_hinge"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("propose"));
}

#[test]
fn test_new_and_list() {
    let dir = with_campaign();
    let output = run_hinge(dir.path(), &["list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("wren"));
    assert!(stdout(&output).contains("The Drowned Market"));
}

#[test]
fn test_new_twice_fails() {
    let dir = with_campaign();
    let output = run_hinge(dir.path(), &["new", "wren"]);
    assert!(!output.status.success());
}

#[test]
fn test_status_json() {
    let dir = with_campaign();
    let output = run_hinge(dir.path(), &["status", "wren", "--json"]);
    assert!(output.status.success());

    let view: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["state_version"], 0);
    assert_eq!(view["player"]["current_region"], "docks");
}

// =============================================================================
// Turns
// =============================================================================

#[test]
fn test_propose_does_not_advance() {
    let dir = with_campaign();
    let output = run_hinge(
        dir.path(),
        &["propose", "wren", "--payload", r#"{"type":"travel","destination":"market"}"#],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("blocked"));
    assert!(stdout(&output).contains("Alternatives"));

    let status = run_hinge(dir.path(), &["status", "wren", "--json"]);
    let view: Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(view["turn_count"], 0);
}

#[test]
fn test_act_commits_and_is_idempotent() {
    let dir = with_campaign();
    let args = ["act", "wren", "--payload", RISKY, "--action-id", "go", "--json"];

    let first = run_hinge(dir.path(), &args);
    assert!(first.status.success(), "{}", stderr(&first));
    let again = run_hinge(dir.path(), &args);
    assert!(again.status.success(), "{}", stderr(&again));
    assert_eq!(stdout(&first), stdout(&again));

    let result: Value = serde_json::from_str(&stdout(&first)).unwrap();
    assert_eq!(result["new_state_version"], 1);
}

#[test]
fn test_stale_version_is_rejected() {
    let dir = with_campaign();
    run_hinge(dir.path(), &["act", "wren", "--payload", RISKY]);

    let output = run_hinge(
        dir.path(),
        &["act", "wren", "--payload", RISKY, "--state-version", "0"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("STALE_STATE"));
}

#[test]
fn test_hinges_and_log() {
    let dir = with_campaign();
    let choice = r#"{"type":"commit_choice","situation":"Marrow asks you to stay","choice":"you stay"}"#;
    let output = run_hinge(dir.path(), &["act", "wren", "--payload", choice]);
    assert!(output.status.success(), "{}", stderr(&output));

    let hinges = run_hinge(dir.path(), &["hinges", "wren"]);
    assert!(stdout(&hinges).contains("Marrow asks you to stay"));

    let log = run_hinge(dir.path(), &["log", "wren"]);
    assert!(stdout(&log).contains("hinge_recorded"));
    assert!(stdout(&log).contains("turn_ended"));
}

#[test]
fn test_delete() {
    let dir = with_campaign();
    assert!(run_hinge(dir.path(), &["delete", "wren"]).status.success());
    assert!(!run_hinge(dir.path(), &["status", "wren"]).status.success());
}
