use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn snapvault(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("snapvault").unwrap();
    cmd.arg("--home").arg(home).env_remove("SNAPVAULT_HOME");
    cmd
}

/// Home with users and patients data but no settings table file
fn clinic_home() -> TempDir {
    let home = TempDir::new().unwrap();
    let data = home.path().join("data");
    fs::create_dir_all(&data).unwrap();

    fs::write(
        data.join("users.json"),
        json!([{"id": 1}, {"id": 2}, {"id": 3}]).to_string(),
    )
    .unwrap();
    fs::write(
        data.join("patients.json"),
        json!([{"id": 10, "user_id": 1, "name": "Ana"}]).to_string(),
    )
    .unwrap();
    fs::write(home.path().join("schema.prisma"), "model User { id Int }").unwrap();
    fs::write(
        home.path().join("config.json"),
        json!({
            "database_name": "clinic",
            "tables": [
                {"table": "settings"},
                {"table": "users", "include": ["patients"]}
            ]
        })
        .to_string(),
    )
    .unwrap();

    home
}

fn only_backup_dir(home: &Path) -> std::path::PathBuf {
    let mut dirs: Vec<_> = fs::read_dir(home.join("backups"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(dirs.len(), 1);
    dirs.remove(0)
}

#[test]
fn run_with_broken_table_succeeds() {
    let home = clinic_home();

    snapvault(home.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup Complete: clinic"))
        .stdout(predicate::str::contains("Records: 3"))
        .stdout(predicate::str::contains("FAILED"));

    let dir = only_backup_dir(home.path());
    let summary: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();

    assert_eq!(summary["metadata"]["record_counts"], json!({"settings": 0, "users": 3}));
    assert_eq!(summary["metadata"]["total_records"], 3);
    assert_eq!(summary["metadata"]["failed_tables"], json!(["settings"]));

    let snapshot_file = summary["snapshot_file"].as_str().unwrap();
    let snapshot: Value =
        serde_json::from_str(&fs::read_to_string(dir.join(snapshot_file)).unwrap()).unwrap();
    assert_eq!(snapshot["data"]["settings"], json!([]));
    assert_eq!(snapshot["data"]["users"][0]["patients"][0]["name"], "Ana");
}

#[test]
fn run_without_data_dir_fails() {
    let home = clinic_home();
    fs::remove_dir_all(home.path().join("data")).unwrap();

    snapvault(home.path())
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Connection error"));
}

#[test]
fn run_rotates_old_backups() {
    let home = clinic_home();
    for day in 10..17 {
        fs::create_dir_all(home.path().join("backups").join(format!("2000-01-{}", day))).unwrap();
    }

    snapvault(home.path())
        .args(["run", "--keep", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2000-01-10"));

    let remaining = fs::read_dir(home.path().join("backups")).unwrap().count();
    assert_eq!(remaining, 5);
}

#[test]
fn prune_is_dry_run_without_force() {
    let home = clinic_home();
    for day in 10..17 {
        fs::create_dir_all(home.path().join("backups").join(format!("2000-01-{}", day))).unwrap();
    }

    snapvault(home.path())
        .args(["prune", "--keep", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    assert_eq!(fs::read_dir(home.path().join("backups")).unwrap().count(), 7);

    snapvault(home.path())
        .args(["prune", "--keep", "5", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 2 backup(s)."));
    assert_eq!(fs::read_dir(home.path().join("backups")).unwrap().count(), 5);
}

#[test]
fn fingerprint_is_stable() {
    let home = clinic_home();

    let first = snapvault(home.path()).arg("fingerprint").output().unwrap();
    let second = snapvault(home.path()).arg("fingerprint").output().unwrap();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert!(!String::from_utf8_lossy(&first.stdout).trim().is_empty());
}

#[test]
fn list_shows_backups() {
    let home = clinic_home();
    snapvault(home.path()).arg("run").assert().success();

    snapvault(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn invalid_config_fails() {
    let home = clinic_home();
    fs::write(
        home.path().join("config.json"),
        json!({"retention": {"keep": 0}}).to_string(),
    )
    .unwrap();

    snapvault(home.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention.keep"));
}

#[test]
fn prune_respects_run_lock() {
    let home = clinic_home();
    let backups = home.path().join("backups");
    for day in 10..17 {
        fs::create_dir_all(backups.join(format!("2000-01-{}", day))).unwrap();
    }
    fs::write(backups.join(".snapvault.lock"), "run other pid 1").unwrap();

    snapvault(home.path())
        .args(["prune", "--keep", "5", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));
    assert_eq!(
        fs::read_dir(&backups).unwrap().filter(|e| e.as_ref().unwrap().path().is_dir()).count(),
        7
    );
}

#[test]
fn run_break_lock_takes_over_held_lock() {
    let home = clinic_home();
    let backups = home.path().join("backups");
    fs::create_dir_all(&backups).unwrap();
    fs::write(backups.join(".snapvault.lock"), "run other pid 1").unwrap();

    snapvault(home.path()).arg("run").assert().failure().code(1);

    snapvault(home.path())
        .args(["run", "--break-lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup Complete: clinic"));
    assert!(!backups.join(".snapvault.lock").exists());
}
