use rusqlite::Connection;
use serde_json::json;
use sqlsage_core::executor::{FailureKind, QueryExecutor, QueryOutcome};

fn employees_db(dir: &std::path::Path) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join("company.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE employees(id INTEGER PRIMARY KEY, name TEXT, salary REAL);
         INSERT INTO employees VALUES (1, 'Ada', 120.5), (2, 'Linus', NULL);",
    )?;
    Ok(path)
}

#[test]
fn test_select_returns_typed_rows() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = QueryExecutor::new(employees_db(dir.path())?);

    match exec.run("SELECT id, name, salary FROM employees ORDER BY id") {
        QueryOutcome::Rows(rows) => {
            assert_eq!(rows.columns, vec!["id", "name", "salary"]);
            assert_eq!(rows.rows[0], vec![json!(1), json!("Ada"), json!(120.5)]);
            assert_eq!(rows.rows[1][2], json!(null));
        }
        other => panic!("expected rows, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_malformed_sql_is_returned_not_raised() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = QueryExecutor::new(employees_db(dir.path())?);

    for (sql, cause) in [
        ("SELEC name FROM employees", "syntax error"),
        ("SELECT * FROM staff", "no such table: staff"),
        ("SELECT nope FROM employees", "no such column: nope"),
    ] {
        match exec.run(sql) {
            QueryOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Execution);
                assert!(f.description.contains(cause), "{}: {}", sql, f.description);
            }
            other => panic!("expected failure for {}, got {:?}", sql, other),
        }
    }
    Ok(())
}

#[test]
fn test_missing_database_is_not_created() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.db");
    let exec = QueryExecutor::new(&path);

    match exec.run("SELECT 1") {
        QueryOutcome::Failure(f) => {
            assert_eq!(f.kind, FailureKind::DatabaseNotFound);
            assert!(f.description.starts_with("database not found"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!path.exists());
    Ok(())
}
