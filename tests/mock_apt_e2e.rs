//! Install and roll back through mock `apt-get` / `dpkg` scripts placed
//! first on PATH. The scripts keep installed packages as files in a
//! scratch directory.
#![cfg(target_os = "linux")]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const APT_GET: &str = r#"#!/bin/sh
echo "apt-get $*" >> "$MOCK_DB/../calls.log"
sub="$1"; shift
case "$sub" in
  install)
    for p in "$@"; do
      case "$p" in
        -*) ;;
        ghost) echo "E: Unable to locate package $p" >&2; exit 100 ;;
      esac
    done
    for p in "$@"; do
      case "$p" in -*) ;; *) echo "1.2.3-1" > "$MOCK_DB/$p" ;; esac
    done
    ;;
  remove)
    for p in "$@"; do
      case "$p" in -*) ;; *) rm -f "$MOCK_DB/$p" ;; esac
    done
    ;;
esac
exit 0
"#;

const DPKG: &str = r#"#!/bin/sh
if [ "$1" = "-s" ] && [ -f "$MOCK_DB/$2" ]; then
  echo "Package: $2"
  echo "Status: install ok installed"
  exit 0
fi
echo "dpkg-query: package '$2' is not installed" >&2
exit 1
"#;

const DPKG_QUERY: &str = r#"#!/bin/sh
for p in "$@"; do pkg="$p"; done
if [ -f "$MOCK_DB/$pkg" ]; then
  printf '%s\ninstall ok installed\n' "$(cat "$MOCK_DB/$pkg")"
  exit 0
fi
echo "dpkg-query: no packages found matching $pkg" >&2
exit 1
"#;

const APT_CACHE: &str = r#"#!/bin/sh
case "$1" in
  policy) echo "$2:"; echo "  Installed: (none)"; echo "  Candidate: 1.2.3-1" ;;
  madison) echo " $2 | 1.2.3-1 | http://deb.example.org stable/main amd64 Packages" ;;
esac
exit 0
"#;

struct MockHost {
    tmp: TempDir,
    bin: PathBuf,
    db: PathBuf,
}

impl MockHost {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tmp.path().join("bin");
        let db = tmp.path().join("db");
        fs::create_dir_all(&bin).expect("mkdir bin");
        fs::create_dir_all(&db).expect("mkdir db");

        for (name, script) in [
            ("apt-get", APT_GET),
            ("dpkg", DPKG),
            ("dpkg-query", DPKG_QUERY),
            ("apt-cache", APT_CACHE),
        ] {
            let path = bin.join(name);
            fs::write(&path, script).expect("write script");
            let mut perms = fs::metadata(&path).expect("metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("chmod");
        }

        Self { tmp, bin, db }
    }

    fn journal(&self) -> PathBuf {
        self.tmp.path().join("state/installations.json")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stackmatch"));
        let path = format!(
            "{}:{}",
            self.bin.display(),
            std::env::var("PATH").unwrap_or_default()
        );
        cmd.env("PATH", path)
            .env("MOCK_DB", &self.db)
            .env("NO_COLOR", "1")
            .env("STACKMATCH_CONFIG", self.tmp.path().join("stackmatch.kdl"))
            .env("STACKMATCH_JOURNAL", self.journal());
        cmd
    }

    fn installed(&self, package: &str) -> bool {
        self.db.join(package).exists()
    }

    fn records(&self) -> Vec<Value> {
        let journal: Value =
            serde_json::from_str(&fs::read_to_string(self.journal()).expect("read journal"))
                .expect("parse journal");
        journal["installations"]
            .as_object()
            .expect("installations map")
            .values()
            .cloned()
            .collect()
    }
}

fn tracked_names(record: &Value) -> Vec<String> {
    let mut names: Vec<String> = record["packages"]
        .as_object()
        .expect("packages map")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

fn calls(root: &Path) -> String {
    fs::read_to_string(root.join("calls.log")).unwrap_or_default()
}

#[test]
fn install_then_roll_back() {
    let host = MockHost::new();

    host.cmd()
        .args(["install", "git", "curl", "--manager", "apt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    assert!(host.installed("git"));
    assert!(host.installed("curl"));
    // Unconstrained packages go through one apt-get call
    assert!(calls(host.tmp.path()).contains("apt-get install --assume-yes git curl"));

    let records = host.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["status"], "completed");
    assert_eq!(tracked_names(record), vec!["curl", "git"]);
    assert_eq!(record["packages"]["git"]["version"], "1.2.3-1");
    assert_eq!(record["packages"]["git"]["manager_type"], "apt");
    let id = record["id"].as_str().expect("id").to_string();

    host.cmd()
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));

    host.cmd()
        .args(["rollback", id.as_str(), "-y"])
        .assert()
        .success();

    assert!(!host.installed("git"));
    assert!(!host.installed("curl"));
    let log = calls(host.tmp.path());
    let curl_removed = log.find("remove --assume-yes curl").expect("curl removed");
    let git_removed = log.find("remove --assume-yes git").expect("git removed");
    assert!(curl_removed < git_removed, "rollback runs newest first");

    let records = host.records();
    assert_eq!(records[0]["status"], "rolled_back");
}

#[test]
fn partial_failure_keeps_what_was_installed() {
    let host = MockHost::new();

    host.cmd()
        .args(["install", "git", "ghost", "--manager", "apt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));

    assert!(host.installed("git"));
    assert!(!host.installed("ghost"));

    let records = host.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "failed");
    assert_eq!(tracked_names(&records[0]), vec!["git"]);
    assert!(
        records[0]["metadata"]["failure_reason"]
            .as_str()
            .expect("failure reason")
            .contains("ghost")
    );
}

#[test]
fn dry_run_installs_nothing() {
    let host = MockHost::new();

    host.cmd()
        .args(["install", "docker", "nodejs@>=18", "--manager", "apt", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docker -> docker.io"))
        .stdout(predicate::str::contains(">=18"));

    assert!(calls(host.tmp.path()).is_empty());
    assert!(!host.journal().exists());
}
