use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Binary isolated from the user's config and journal.
fn stackmatch(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stackmatch"));
    cmd.env("STACKMATCH_CONFIG", tmp.path().join("stackmatch.kdl"))
        .env("STACKMATCH_JOURNAL", tmp.path().join("installations.json"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_describes_the_tool() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Replay a development environment"))
        .stdout(predicate::str::contains("rollback"));
}

#[test]
fn version_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let expected = format!("stackmatch {}", env!("CARGO_PKG_VERSION"));
    stackmatch(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn unknown_command_prints_usage() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .arg("unknown-command-xyz")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: stackmatch"));
}

#[test]
fn empty_history() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No installations recorded yet"));
}

#[test]
fn unknown_record_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .args(["history", "inst_00000000000000000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Installation record not found"));

    stackmatch(&tmp)
        .args(["rollback", "inst_00000000000000000001", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Installation record not found"));
}

#[test]
fn unknown_manager_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .args(["install", "git", "--manager", "portage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown package manager 'portage'"));
}

#[test]
fn invalid_settings_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("stackmatch.kdl"), "colour \"auto\"\n").unwrap();
    stackmatch(&tmp)
        .arg("history")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting 'colour'"));
}

#[test]
fn apply_rejects_non_snapshot_files() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("other.json");
    fs::write(&file, r#"{"hello": "world"}"#).unwrap();
    stackmatch(&tmp)
        .arg("apply")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not an environment snapshot"));
}

#[test]
fn managers_lists_every_driver() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .arg("managers")
        .assert()
        .success()
        .stdout(predicate::str::contains("APT"))
        .stdout(predicate::str::contains("Winget"));
}

#[test]
fn completions_are_generated() {
    let tmp = tempfile::tempdir().unwrap();
    stackmatch(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stackmatch"));
}
