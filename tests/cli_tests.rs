//! CLI Integration Tests for ensemble
//!
//! Runs the built binary against temporary configuration files. None of these
//! commands contact an LLM provider.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

const CONFIG: &str = r#"
[providers.local]
type = "ollama"

[providers.spare]
type = "ollama"

[models.fast]
provider = "local"
model = "llama3.2"

[planner]
model = "fast"

[synthesizer]
model = "fast"

[workers.review]
model = "fast"
description = "Owner reviews and reliability"

[workers.market]
model = "fast"
description = "Market trends"
enabled = false
"#;

/// Helper to run ensemble with arguments inside `dir`
fn run_ensemble(args: &[&str], dir: &TempDir) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ensemble"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn temp_with_config() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("ensemble.toml"), CONFIG).unwrap();
    dir
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    let output = run_ensemble(&["--help"], &dir);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ensemble"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("plan"));
    assert!(stdout.contains("workers"));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_ensemble(&["workers", "list"], &dir);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ensemble.toml"));
}

#[test]
fn test_workers_list() {
    let dir = temp_with_config();
    let output = run_ensemble(&["--no-color", "workers", "list"], &dir);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("review [fast] - Owner reviews and reliability"));
    assert!(stdout.contains("market [fast] - Market trends (disabled)"));
    assert!(stdout.contains("default: review"));
}

#[test]
fn test_config_validate_reports_warnings() {
    let dir = temp_with_config();
    let output = run_ensemble(&["--no-color", "config", "--validate"], &dir);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Provider 'spare' is defined but not referenced by any model"));
    assert!(stdout.contains("Worker 'market' is disabled"));
    assert!(stdout.contains("Configuration is valid (2 warning(s))"));
}

#[test]
fn test_custom_config_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("alt.toml"), CONFIG).unwrap();

    let output = run_ensemble(&["--no-color", "--config", "alt.toml", "config"], &dir);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alt.toml"));
    assert!(stdout.contains("worker timeout: 60s"));
}

#[test]
fn test_run_rejects_non_positive_timeout() {
    let dir = temp_with_config();
    let output = run_ensemble(&["run", "q", "--timeout", "0"], &dir);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--timeout"));
}

#[test]
fn test_run_rejects_timeout_beyond_duration_range() {
    let dir = temp_with_config();
    let output = run_ensemble(&["run", "q", "--timeout", "1e300"], &dir);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--timeout"));
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_config_rejects_huge_worker_timeout() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("ensemble.toml"),
        format!("[orchestrator]\nworker_timeout_secs = 1e20\n{}", CONFIG),
    )
    .unwrap();

    let output = run_ensemble(&["config"], &dir);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("worker_timeout_secs"));
    assert!(!stderr.contains("panicked"));
}
