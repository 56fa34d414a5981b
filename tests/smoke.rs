//! Smoke tests -- verify the binary runs and rejects bad input cleanly.

use assert_cmd::Command;
use predicates::prelude::*;

fn reachprobe() -> Command {
    let mut cmd = Command::cargo_bin("reachprobe").unwrap();
    cmd.env_remove("REACHPROBE_CONFIG");
    cmd
}

#[test]
fn test_cli_help() {
    reachprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("host reachability probing"));
}

#[test]
fn test_cli_version() {
    reachprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("reachprobe"));
}

#[test]
fn test_run_subcommand_exists() {
    reachprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--attempts"));
}

#[test]
fn test_run_rejects_out_of_range_attempts() {
    reachprobe()
        .args(["run", "--host", "127.0.0.1", "--attempts", "21"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicates::str::contains("between 1 and 20"));
}

#[test]
fn test_run_rejects_non_numeric_attempts() {
    reachprobe()
        .args(["run", "--host", "127.0.0.1", "--attempts", "many", "--json"])
        .assert()
        .failure()
        .stdout(predicates::str::contains("\"event\":\"validation_failed\""));
}

#[test]
fn test_run_against_closed_local_port() {
    // Port 1 on loopback is refused on any sane host; the run still completes.
    reachprobe()
        .args([
            "run",
            "--host",
            "127.0.0.1",
            "--attempts",
            "2",
            "--port",
            "1",
            "--pause-ms",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicates::str::contains("I/O failure"))
        .stdout(predicates::str::contains("2 of 2 attempts run, 0 succeeded, 2 failed"));
}

#[test]
fn test_config_prints_defaults() {
    reachprobe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicates::str::contains("[probe]"))
        .stdout(predicates::str::contains("timeout_ms = 5000"))
        .stdout(predicates::str::contains("pause_ms = 500").and(predicates::str::contains("method = \"tcp\"")));
}
