use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn habitlock_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("habitlock"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

#[test]
fn help_lists_top_level_commands() {
    let home = TempDir::new().expect("home");
    habitlock_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("daemon"))
        .stdout(contains("refresh"))
        .stdout(contains("reset"))
        .stdout(contains("bypass"))
        .stdout(contains("status"));
}

#[test]
fn ping_without_daemon_reports_not_running() {
    let home = TempDir::new().expect("home");
    habitlock_cmd(home.path())
        .args(["daemon", "ping"])
        .assert()
        .failure()
        .stdout(contains("daemon is not running"));
}

#[test]
fn refresh_without_daemon_reports_not_running() {
    let home = TempDir::new().expect("home");
    habitlock_cmd(home.path())
        .arg("refresh")
        .assert()
        .failure()
        .stdout(contains("daemon is not running"));
}

#[test]
fn bypass_duration_is_validated_before_contacting_the_daemon() {
    let home = TempDir::new().expect("home");
    // Out-of-range minutes are a usage error even with no daemon socket.
    habitlock_cmd(home.path())
        .args(["bypass", "start", "0"])
        .assert()
        .failure()
        .stderr(contains("0 is not in 1..=120"));
    habitlock_cmd(home.path())
        .args(["bypass", "start", "121"])
        .assert()
        .failure()
        .stderr(contains("121 is not in 1..=120"));
}

#[test]
fn daemon_logs_handles_missing_log_files() {
    let home = TempDir::new().expect("home");
    habitlock_cmd(home.path())
        .args(["daemon", "logs"])
        .assert()
        .success()
        .stdout(contains("log file not found"));
}
