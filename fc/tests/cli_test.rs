//! Smoke tests for the `fc` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fc(temp: &TempDir) -> Command {
    let config = temp.path().join("fitcoach.yml");
    std::fs::write(
        &config,
        format!(
            "llm:\n  api-key-env: FITCOACH_TEST_MISSING_KEY\nstorage:\n  db-path: {}\nretrieval:\n  index-dir: {}\n",
            temp.path().join("users.db").display(),
            temp.path().join("index").display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fc").expect("fc binary should build");
    cmd.env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env_remove("FITCOACH_TEST_MISSING_KEY")
        .arg("--config")
        .arg(&config);
    cmd
}

#[test]
fn test_version() {
    Command::cargo_bin("fc")
        .expect("fc binary should build")
        .arg("--version")
        .assert()
        .success();
}

#[test]
fn test_ask_without_api_key_fails() {
    let temp = TempDir::new().unwrap();
    fc(&temp)
        .args(["ask", "--user", "u1", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FITCOACH_TEST_MISSING_KEY"));
}

#[test]
fn test_ask_rejects_bad_start_date() {
    let temp = TempDir::new().unwrap();
    fc(&temp)
        .args(["ask", "--user", "u1", "--start-date", "01/03/2024", "meal", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start_date format"));
}

#[test]
fn test_empty_history_and_plans() {
    let temp = TempDir::new().unwrap();
    fc(&temp)
        .args(["history", "--user", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history for ghost"));

    fc(&temp)
        .args(["plans", "--user", "ghost", "--type", "workout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workout plans for ghost"));
}

#[test]
fn test_index_build_and_query() {
    let temp = TempDir::new().unwrap();
    let doc = temp.path().join("hydration.md");
    std::fs::write(&doc, "Drink water before, during and after endurance sessions.").unwrap();

    fc(&temp)
        .args(["index", "build"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 1 chunks"));

    fc(&temp)
        .args(["index", "query", "endurance water"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Drink water"));
}
