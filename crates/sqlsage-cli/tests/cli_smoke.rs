use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use tempfile::TempDir;

fn sqlsage(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sqlsage").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("SQLSAGE_DB_PATH")
        .env_remove("SQLSAGE_SCHEMA_PATH")
        .env_remove("SQLSAGE_INDEX_DIR")
        .env_remove("SQLSAGE_PROVIDER")
        .env("SQLSAGE_LOG", "warn");
    cmd
}

fn seed_db(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("data")).unwrap();
    let conn = rusqlite::Connection::open(dir.path().join("data/chinook.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE employees(id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO employees(name) VALUES ('Ada'), ('Linus');",
    )
    .unwrap();
}

#[test]
fn test_config_prints_resolved_values() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sqlsage.yaml"), "search_k: 4\n").unwrap();

    sqlsage(&dir)
        .env("SQLSAGE_ANSWER_LANGUAGE", "Korean")
        .arg("config")
        .assert()
        .success()
        .stdout(contains("search_k: 4"))
        .stdout(contains("answer_language: Korean"))
        .stdout(contains("db_path: data/chinook.db"));
}

#[test]
fn test_strict_config_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sqlsage.yaml"), "serach_k: 4\n").unwrap();

    sqlsage(&dir)
        .args(["--strict-config", "config"])
        .assert()
        .code(2)
        .stderr(contains("config error"));
}

#[test]
fn test_missing_explicit_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    sqlsage(&dir)
        .args(["--config", "nope.yaml", "config"])
        .assert()
        .code(2);
}

#[test]
fn test_query_prints_rows_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    seed_db(&dir);

    sqlsage(&dir)
        .args(["query", "SELECT name FROM employees ORDER BY id"])
        .assert()
        .success()
        .stdout(contains("name\nAda\nLinus"));

    sqlsage(&dir)
        .args(["query", "SELECT * FROM staff"])
        .assert()
        .code(1)
        .stderr(contains("no such table: staff"));
}

#[test]
fn test_schema_index_search_offline() {
    let dir = TempDir::new().unwrap();
    seed_db(&dir);

    sqlsage(&dir).arg("schema").assert().success();
    let yaml = fs::read_to_string(dir.path().join("metadata/schema_metadata.yaml")).unwrap();
    assert!(yaml.contains("employees:"));

    sqlsage(&dir)
        .args(["--provider", "fake", "index", "--rebuild"])
        .assert()
        .success()
        .stderr(contains("indexed 1 documents"));

    sqlsage(&dir)
        .args(["--provider", "fake", "search", "who works here", "-k", "3"])
        .assert()
        .success()
        .stdout(contains("Table: employees").and(contains("- name (TEXT)")));
}

#[test]
fn test_schema_without_database_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    sqlsage(&dir)
        .arg("schema")
        .assert()
        .code(1)
        .stderr(contains("database not found"));
}

#[test]
fn test_openai_provider_requires_key() {
    let dir = TempDir::new().unwrap();
    sqlsage(&dir)
        .args(["search", "anything"])
        .assert()
        .code(1)
        .stderr(contains("OPENAI_API_KEY"));
}

#[test]
fn test_cancelled_query_can_be_confirmed_in_a_later_session() {
    let dir = TempDir::new().unwrap();
    seed_db(&dir);
    let chat = ["--provider", "fake", "chat", "--checkpoint-db", "state/checkpoints.db"];

    sqlsage(&dir)
        .args(chat)
        .write_stdin("list all employee names\nn\nq\n")
        .assert()
        .success()
        .stdout(contains("Generated SQL:").and(contains("SELECT 1")))
        .stdout(contains("Query cancelled."))
        .stdout(contains("Result (").not());

    sqlsage(&dir)
        .args(chat)
        .write_stdin("y\nq\n")
        .assert()
        .success()
        .stdout(contains("Pending question: list all employee names"))
        .stdout(contains("Result (1 rows):"))
        .stdout(contains("Assistant:"));

    // Nothing is left waiting once the turn completed.
    sqlsage(&dir)
        .args(chat)
        .write_stdin("/run\nq\n")
        .assert()
        .success()
        .stdout(contains("No query is waiting for confirmation."));
}

#[test]
fn test_run_command_confirms_pending_query_in_the_same_session() {
    let dir = TempDir::new().unwrap();
    seed_db(&dir);

    sqlsage(&dir)
        .args(["--provider", "fake", "chat"])
        .write_stdin("how many employees?\nn\n/run\ny\nq\n")
        .assert()
        .success()
        .stdout(contains("Query cancelled."))
        .stdout(contains("Pending SQL:"))
        .stdout(contains("Result (1 rows):"));
}
