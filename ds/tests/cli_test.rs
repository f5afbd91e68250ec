//! Smoke tests for the `ds` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ds(store: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ds").expect("ds binary should build");
    cmd.arg("--store").arg(store);
    cmd
}

#[test]
fn test_build_query_and_stats() {
    let temp = TempDir::new().unwrap();
    let store = temp.path().join("index");
    let docs = temp.path().join("refs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(docs.join("fiber.md"), "Oats and lentils are rich in dietary fiber.").unwrap();
    std::fs::write(docs.join("iron.txt"), "Spinach provides iron.").unwrap();

    ds(&store)
        .arg("build")
        .arg(&docs)
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed"));

    ds(&store)
        .args(["query", "fiber lentils"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0001"));

    ds(&store)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Document chunks: 2"));
}

#[test]
fn test_query_before_build_fails() {
    let temp = TempDir::new().unwrap();

    ds(&temp.path().join("index"))
        .args(["query", "protein"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Index not built"));
}

#[test]
fn test_build_without_inputs_fails() {
    let temp = TempDir::new().unwrap();

    ds(&temp.path().join("index"))
        .arg("build")
        .assert()
        .failure();
}
