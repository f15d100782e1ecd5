use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Rows returned by a successful statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pipe-separated table, header first, at most `max_rows` data rows.
    pub fn render(&self, max_rows: usize) -> String {
        let mut out = self.columns.join(" | ");
        for row in self.rows.iter().take(max_rows) {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(render_json_cell).collect();
            out.push_str(&cells.join(" | "));
        }
        if self.rows.len() > max_rows {
            out.push_str(&format!("\n... ({} more rows)", self.rows.len() - max_rows));
        }
        out
    }
}

fn render_json_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DatabaseNotFound,
    Execution,
}

/// Why a statement produced no rows. Returned as data, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub description: String,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum QueryOutcome {
    Rows(QueryRows),
    Failure(QueryFailure),
}

#[derive(Debug, Clone)]
pub struct QueryExecutor {
    db_path: PathBuf,
}

impl QueryExecutor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run(&self, sql: &str) -> QueryOutcome {
        if !self.db_path.exists() {
            tracing::warn!(
                event = "sqlsage.query.database_missing",
                db = %self.db_path.display()
            );
            return QueryOutcome::Failure(QueryFailure {
                kind: FailureKind::DatabaseNotFound,
                description: format!("database not found: {}", self.db_path.display()),
            });
        }

        match execute(&self.db_path, sql) {
            Ok(rows) => {
                tracing::info!(event = "sqlsage.query.executed", rows = rows.len());
                QueryOutcome::Rows(rows)
            }
            Err(e) => {
                tracing::warn!(event = "sqlsage.query.failed", error = %e);
                QueryOutcome::Failure(QueryFailure {
                    kind: FailureKind::Execution,
                    description: e.to_string(),
                })
            }
        }
    }
}

fn execute(db_path: &Path, sql: &str) -> rusqlite::Result<QueryRows> {
    // No CREATE flag: a path that vanished between the check and the open
    // must fail instead of leaving an empty database behind.
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags)?;

    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(json_cell(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    Ok(QueryRows { columns, rows })
}

fn json_cell(v: ValueRef<'_>) -> serde_json::Value {
    match v {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(format!("<blob {} bytes>", b.len())),
    }
}

/// Plain-text rendering of a SQLite value, used for schema samples.
pub(crate) fn render_cell(v: ValueRef<'_>) -> String {
    render_json_cell(&json_cell(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> anyhow::Result<(tempfile::TempDir, QueryExecutor)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("emp.db");
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, salary REAL);
             INSERT INTO employees(name, salary) VALUES ('Ada', 10.5), ('Linus', NULL);",
        )?;
        Ok((dir, QueryExecutor::new(path)))
    }

    #[test]
    fn returns_typed_rows() -> anyhow::Result<()> {
        let (_dir, exec) = fixture()?;
        let QueryOutcome::Rows(rows) = exec.run("SELECT id, name, salary FROM employees ORDER BY id")
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.columns, vec!["id", "name", "salary"]);
        assert_eq!(rows.rows[0], vec![serde_json::json!(1), "Ada".into(), 10.5.into()]);
        assert_eq!(rows.rows[1][2], serde_json::Value::Null);
        Ok(())
    }

    #[test]
    fn render_truncates_long_results() {
        let rows = QueryRows {
            columns: vec!["n".into()],
            rows: (0..5).map(|i| vec![serde_json::json!(i)]).collect(),
        };
        let text = rows.render(2);
        assert_eq!(text, "n\n0\n1\n... (3 more rows)");
    }

    #[test]
    fn failures_are_values() -> anyhow::Result<()> {
        let (_dir, exec) = fixture()?;
        match exec.run("SELEC nonsense") {
            QueryOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Execution);
                assert!(f.description.contains("syntax error"), "{}", f);
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn missing_database_is_distinct_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let exec = QueryExecutor::new(&path);
        match exec.run("SELECT 1") {
            QueryOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::DatabaseNotFound);
                assert!(f.description.starts_with("database not found"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!path.exists());
    }
}
