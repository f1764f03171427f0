use chrono::{Duration, Local};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn devcheck(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("devcheck");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("DEVCHECK_HOME", home)
        .env("DEVCHECK_CONFIG_PATH", home.join("devcheck.toml"))
        .env_remove("DEVCHECK_RETENTION_DAYS");
    cmd
}

#[test]
fn archive_copies_aged_files_into_month_buckets() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path();
    let logs = home.join("browser_logs");
    let photos = home.join("face_photos");
    fs::create_dir_all(&logs).expect("mkdir logs");
    fs::create_dir_all(&photos).expect("mkdir photos");

    let now = Local::now().naive_local();
    let old = now - Duration::days(91);
    let fresh = now - Duration::days(10);
    let old_log = format!("PC01_alice_{}.json", old.format("%Y-%m-%d_%H%M%S"));
    let fresh_log = format!("PC02_bob_{}.json", fresh.format("%Y-%m-%d_%H%M%S"));
    let old_photo = format!("PC01_alice_{}.jpg", old.format("%Y%m%d_%H%M%S"));
    fs::write(logs.join(&old_log), "[]").expect("write old log");
    fs::write(logs.join(&fresh_log), "[]").expect("write fresh log");
    fs::write(photos.join(&old_photo), b"jpeg").expect("write old photo");

    devcheck(home)
        .args(["archive", "--days", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "browser_log scanned=2 archived=1 already_archived=0 retained=1",
        ))
        .stdout(predicate::str::contains("face_photo scanned=1 archived=1"));

    let month = old.format("%Y-%m").to_string();
    assert!(home.join("archives/browser_logs").join(&month).join(&old_log).is_file());
    assert!(home.join("archives/face_photos").join(&month).join(&old_photo).is_file());
    assert!(logs.join(&old_log).is_file());

    devcheck(home)
        .arg("archive")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "browser_log scanned=2 archived=0 already_archived=1",
        ));
}

#[test]
fn archive_rejects_zero_days() {
    let tmp = tempdir().expect("tempdir");
    devcheck(tmp.path())
        .args(["archive", "--days", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--days"));
}

#[test]
fn archive_with_missing_folder_reports_issue() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("browser_logs")).expect("mkdir logs");
    devcheck(tmp.path())
        .arg("archive")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("face_photo folder unavailable"));
}

#[test]
fn menu_exits_on_zero_and_end_of_input() {
    let tmp = tempdir().expect("tempdir");
    devcheck(tmp.path())
        .arg("menu")
        .write_stdin("7\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid choice: 7"))
        .stdout(predicate::str::contains("actions_run=0"));

    devcheck(tmp.path())
        .arg("menu")
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn run_all_continues_past_failing_steps() {
    let tmp = tempdir().expect("tempdir");
    devcheck(tmp.path())
        .arg("run-all")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("step=report-trend status=issues"))
        .stdout(predicate::str::contains("step=report-overall status=issues"))
        .stdout(predicate::str::contains("step=archive status=issues"));
}
