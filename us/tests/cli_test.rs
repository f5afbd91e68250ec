//! Smoke tests for the `us` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn us(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("us").expect("us binary should build");
    cmd.arg("--db").arg(db);
    cmd
}

#[test]
fn test_profile_set_then_show() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("users.db");
    let profile = temp.path().join("profile.yml");
    std::fs::write(&profile, "name: Robin\nage: 29\nfoodAllergies: shellfish\n").unwrap();

    us(&db)
        .args(["profile", "set", "--user", "u1"])
        .arg(&profile)
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored profile"));

    us(&db)
        .args(["profile", "show", "--user", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Robin"))
        .stdout(predicate::str::contains("shellfish"));
}

#[test]
fn test_empty_history_and_plans() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("users.db");

    us(&db)
        .args(["history", "--user", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history"));

    us(&db)
        .args(["plans", "--user", "ghost", "--type", "workout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workout plans"));
}
