//! Integration tests for the `pulse` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! config management, and error handling. Projector-bound commands run
//! against a scripted socket on localhost.
#![allow(clippy::unwrap_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `pulse` binary with env isolation.
///
/// Clears all `PULSE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn pulse_cmd() -> assert_cmd::Command {
    pulse_cmd_in(Path::new("/tmp/pulse-cli-test-nonexistent"))
}

fn pulse_cmd_in(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG")
        .env_remove("PULSE_PROFILE")
        .env_remove("PULSE_HOST")
        .env_remove("PULSE_PORT")
        .env_remove("PULSE_MAC")
        .env_remove("PULSE_OUTPUT")
        .env_remove("PULSE_CONNECT_TIMEOUT")
        .env_remove("PULSE_LOGIN_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A projector that answers the identity probe once, then waits for the
/// client to hang up.
fn probe_only_projector() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0_u8; 1024];
        let _ = stream.read(&mut buf).unwrap();
        stream
            .write_all(
                br#"{"jsonrpc": "2.0", "result": {"system.modelname": "F80-4K12", "system.serialnumber": "2590012345"}, "id": 1}"#,
            )
            .unwrap();
        let _ = stream.read(&mut buf);
    });
    port
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = pulse_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    pulse_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Barco Pulse")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("sources"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    pulse_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pulse"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    pulse_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    pulse_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = pulse_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_config_is_a_usage_error() {
    pulse_cmd()
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No projector configured"));
}

#[test]
fn test_unknown_profile_is_reported() {
    pulse_cmd()
        .args(["--profile", "lab", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Profile 'lab' not found"));
}

#[test]
fn test_invalid_mac_flag() {
    pulse_cmd()
        .args(["--host", "127.0.0.1", "--mac", "not-a-mac", "off"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mac"));
}

#[test]
fn test_invalid_output_format() {
    let output = pulse_cmd()
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_send_rejects_malformed_params() {
    let port = closed_port();
    pulse_cmd()
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["send", "property.get", "{not json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("params"));
}

// ── Projector-bound commands ────────────────────────────────────────

#[test]
fn test_unreachable_projector_exits_with_connection_code() {
    let port = closed_port();
    pulse_cmd()
        .args(["--host", "127.0.0.1", "--port", &port.to_string(), "status"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect"));
}

#[test]
fn test_probe_prints_device_id() {
    let port = probe_only_projector();
    pulse_cmd()
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["--output", "plain", "test"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Barco:2590012345\n"));
}

#[test]
fn test_probe_json_output() {
    let port = probe_only_projector();
    pulse_cmd()
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["-o", "json", "test"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""model": "F80-4K12""#)
                .and(predicate::str::contains(r#""serial": "2590012345""#)),
        );
}

// ── Config management ───────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // `config show` renders defaults when no file exists.
    pulse_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_init_then_profiles() {
    let home = tempfile::tempdir().unwrap();

    pulse_cmd_in(home.path())
        .args(["config", "init", "--non-interactive", "--name", "lobby"])
        .args(["--host", "10.0.0.5", "--mac", "00:11:22:33:44:55"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Profile 'lobby' written"));

    pulse_cmd_in(home.path())
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("lobby\n"));

    pulse_cmd_in(home.path())
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""host": "10.0.0.5""#));
}

#[test]
fn test_config_set_default_requires_existing_profile() {
    let home = tempfile::tempdir().unwrap();

    pulse_cmd_in(home.path())
        .args(["config", "set-default", "missing"])
        .assert()
        .code(4);

    pulse_cmd_in(home.path())
        .args(["config", "init", "--non-interactive", "--name", "lab"])
        .args(["--host", "10.0.0.6"])
        .assert()
        .success();
    pulse_cmd_in(home.path())
        .args(["config", "set-default", "lab"])
        .assert()
        .success();
}

#[test]
fn test_config_path_lives_under_config_home() {
    let home = tempfile::tempdir().unwrap();
    pulse_cmd_in(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    pulse_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("path"))
                .and(predicate::str::contains("set-default")),
        );
}
