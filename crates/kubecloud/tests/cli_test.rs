//! Integration tests for the `kubecloud` binary.
//!
//! Every invocation runs against the simulated backend with zero latency
//! and no injected failures, and keeps its config and session files in a
//! per-test temporary directory.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`](assert_cmd::Command) isolated inside `home`.
fn kubecloud_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("kubecloud");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("KUBECLOUD_CONFIG", home.join("config.toml"))
        .env("KUBECLOUD_STORAGE_PATH", home.join("session.json"))
        .env("KUBECLOUD_MOCK__DELAY_MS", "0")
        .env("KUBECLOUD_MOCK__ERROR_RATE", "0.0")
        .env("NO_COLOR", "1")
        .env_remove("KUBECLOUD_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_command_groups() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("clusters")
                .and(predicate::str::contains("auth"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kubecloud"));
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

// ── Clusters ────────────────────────────────────────────────────────

#[test]
fn test_clusters_list_json() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["clusters", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let ids: Vec<String> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, ["cluster-1", "cluster-2", "cluster-3"]);
}

#[test]
fn test_clusters_list_filters_by_status() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .args(["clusters", "list", "--status", "stopped", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("cluster-3\n"));
}

#[test]
fn test_clusters_get_unknown_is_not_found() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["clusters", "get", "cluster-9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("cluster-9"));
}

#[test]
fn test_clusters_create_rejects_short_name() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["clusters", "create", "--name", "ab", "--region", "us-west-2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Name must be at least 3 characters"));
}

#[test]
fn test_clusters_start_waits_for_running() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .env("KUBECLOUD_LIFECYCLE__START_DELAY_MS", "10")
        .args(["clusters", "start", "cluster-3", "--wait", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(stdout_json(&output)["status"], "running");
}

#[test]
fn test_clusters_delete_requires_yes_without_tty() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["clusters", "delete", "cluster-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_clusters_summary_json() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["clusters", "summary", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let summary = stdout_json(&output);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["running"], 2);
    assert_eq!(summary["stopped"], 1);
}

// ── Auth ────────────────────────────────────────────────────────────

#[test]
fn test_login_unknown_email_is_auth_failure() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .env("KUBECLOUD_TEST_PASSWORD", "secret")
        .args([
            "auth",
            "login",
            "--email",
            "nouser@example.com",
            "--password-env",
            "KUBECLOUD_TEST_PASSWORD",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Invalid credentials"));
}

#[test]
fn test_login_persists_session_for_later_commands() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .env("KUBECLOUD_TEST_PASSWORD", "secret")
        .args([
            "auth",
            "login",
            "--email",
            "admin@kubecloud.com",
            "--password-env",
            "KUBECLOUD_TEST_PASSWORD",
        ])
        .assert()
        .success();
    assert!(home.path().join("session.json").exists());

    kubecloud_cmd(home.path())
        .args(["auth", "whoami", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("admin@kubecloud.com"));

    kubecloud_cmd(home.path())
        .args(["auth", "logout"])
        .assert()
        .success();

    let output = kubecloud_cmd(home.path())
        .args(["auth", "whoami"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_whoami_without_session() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .args(["auth", "whoami"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Not logged in"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("elsewhere.toml");
    kubecloud_cmd(home.path())
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("elsewhere.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let home = TempDir::new().unwrap();
    kubecloud_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(home.path().join("config.toml").exists());

    let output = kubecloud_cmd(home.path())
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    kubecloud_cmd(home.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_rejects_bad_error_rate() {
    let home = TempDir::new().unwrap();
    let output = kubecloud_cmd(home.path())
        .env("KUBECLOUD_MOCK__ERROR_RATE", "1.5")
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("mock.error_rate"));
}
