//! Command-line integration tests.
//!
//! Runs the built binary against a seeded SQLite database, with
//! `DATABASE_URL` cleared and a config path that does not exist.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

use super::common::TestDb;

fn castlist(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_castlist"))
        .env_remove("DATABASE_URL")
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(config_dir.join("none.toml"))
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_list_prints_catalog_without_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let output = castlist(dir.path(), &["list"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("ford-supporting-films"));
    assert!(text.contains("travoltas-busiest-years"));
    assert!(text.contains("min_films=2"));
}

#[test]
fn test_list_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = castlist(dir.path(), &["--format", "json", "list"]);

    assert!(output.status.success());
    let catalog: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let entries = catalog.as_array().unwrap();
    assert_eq!(entries.len(), castlist::exercises::CATALOG.len());
    assert_eq!(entries[0]["name"], "example-join");
}

#[tokio::test]
async fn test_run_exercise_as_json() {
    let db = TestDb::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db.path());

    let output = castlist(
        dir.path(),
        &[url.as_str(), "--format", "json", "run", "ford-supporting-films"],
    );

    assert!(output.status.success(), "{output:?}");
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["row_count"], 3);
    assert_eq!(result["columns"][0]["name"], "title");
}

#[tokio::test]
async fn test_run_exercise_with_argument_override() {
    let db = TestDb::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db.path());

    let output = castlist(
        dir.path(),
        &[url.as_str(), "run", "travoltas-busiest-years", "John Travolta", "2"],
    );

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout(&output),
        "yr   | film_count\n\
         -----+-----------\n\
         1978 |          2\n\
         1989 |          2\n\
         (2 rows)\n"
    );
}

#[tokio::test]
async fn test_sql_with_params() {
    let db = TestDb::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db.path());

    let output = castlist(
        dir.path(),
        &[
            url.as_str(),
            "sql",
            "SELECT name FROM actors WHERE id = $1",
            "-p",
            "4",
        ],
    );

    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "name\n------------\nSean Connery\n(1 row)\n");
}

#[tokio::test]
async fn test_mutating_sql_fails() {
    let db = TestDb::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db.path());

    let output = castlist(dir.path(), &[url.as_str(), "sql", "DELETE FROM castings"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_unknown_exercise_fails() {
    let db = TestDb::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db.path());

    let output = castlist(dir.path(), &[url.as_str(), "run", "no-such-exercise"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_connection_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = castlist(dir.path(), &["run", "ford-films"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
