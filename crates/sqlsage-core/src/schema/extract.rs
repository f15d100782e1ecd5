use super::{ColumnRecord, Schema, SchemaRecord};
use crate::errors::SqlsageError;
use anyhow::Context;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Distinct non-null values to collect per column; 0 disables sampling.
    pub sample_values: usize,
}

/// Reads tables, columns and keys from a SQLite file.
///
/// Engine-internal `sqlite_%` tables are skipped. Descriptions come back
/// empty; [`super::merge`] fills them from the saved file.
pub fn extract(db_path: &Path, opts: ExtractOptions) -> anyhow::Result<Schema> {
    if !db_path.exists() {
        return Err(SqlsageError::DatabaseUnavailable(db_path.to_path_buf()).into());
    }

    let conn = open_read_only(db_path)?;
    let tables = list_tables(&conn)?;

    let mut schema = Schema::with_capacity(tables.len());
    for table in tables {
        let record = read_table(&conn, &table, opts)
            .with_context(|| format!("failed to introspect table {}", table))?;
        tracing::debug!(
            event = "sqlsage.schema.table_extracted",
            table = %table,
            columns = record.columns.len()
        );
        schema.insert(table, record);
    }

    tracing::info!(
        event = "sqlsage.schema.extracted",
        db = %db_path.display(),
        tables = schema.len()
    );
    Ok(schema)
}

fn open_read_only(db_path: &Path) -> anyhow::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    match Connection::open_with_flags(db_path, flags) {
        Ok(conn) => Ok(conn),
        Err(e) => {
            tracing::warn!(
                event = "sqlsage.schema.read_only_unsupported",
                error = %e,
                "read-only open failed, falling back to a standard connection"
            );
            Connection::open(db_path).context("failed to open sqlite db")
        }
    }
}

fn list_tables(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("failed to list tables")
}

fn read_table(conn: &Connection, table: &str, opts: ExtractOptions) -> anyhow::Result<SchemaRecord> {
    // from column -> "to_table.to_column"
    let mut fk_map: HashMap<String, String> = HashMap::new();
    {
        let mut stmt =
            conn.prepare("SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1)")?;
        let rows = stmt.query_map([table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        for r in rows {
            let (from, to_table, to_col) = r?;
            // A NULL target column means the referenced table's primary key.
            let target = match to_col {
                Some(c) => format!("{}.{}", to_table, c),
                None => to_table,
            };
            fk_map.entry(from).or_insert(target);
        }
    }

    let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut columns = Vec::new();
    for r in rows {
        let (name, data_type, pk) = r?;
        let samples = if opts.sample_values > 0 {
            Some(sample_values(conn, table, &name, opts.sample_values)?)
        } else {
            None
        };
        columns.push(ColumnRecord {
            foreign_key: fk_map.get(&name).cloned(),
            name,
            data_type,
            description: String::new(),
            is_primary_key: pk > 0,
            samples,
        });
    }

    Ok(SchemaRecord {
        description: String::new(),
        columns,
    })
}

fn sample_values(
    conn: &Connection,
    table: &str,
    column: &str,
    limit: usize,
) -> anyhow::Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT {col} FROM {tbl} WHERE {col} IS NOT NULL LIMIT ?1",
        col = quote_ident(column),
        tbl = quote_ident(table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(crate::executor::render_cell(row.get_ref(0)?))
    })?;
    rows.collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to sample {}.{}", table, column))
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(dir: &Path) -> anyhow::Result<std::path::PathBuf> {
        let path = dir.join("shop.db");
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE orders (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 customer_id INTEGER REFERENCES customers(id),
                 total REAL
             );
             INSERT INTO customers(name) VALUES ('Ada'), ('Grace'), ('Ada');
             INSERT INTO orders(customer_id, total) VALUES (1, 9.5);",
        )?;
        Ok(path)
    }

    #[test]
    fn extracts_columns_keys_and_skips_internal_tables() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = fixture(dir.path())?;

        let schema = extract(&db, ExtractOptions::default())?;
        // AUTOINCREMENT creates sqlite_sequence, which must not leak through.
        assert_eq!(
            schema.keys().collect::<Vec<_>>(),
            vec!["customers", "orders"]
        );

        let orders = &schema["orders"];
        let id = orders.column("id").unwrap();
        assert!(id.is_primary_key);
        assert_eq!(id.data_type, "INTEGER");

        let fk = orders.column("customer_id").unwrap();
        assert_eq!(fk.foreign_key.as_deref(), Some("customers.id"));
        assert!(!fk.is_primary_key);
        assert!(fk.samples.is_none());
        assert!(orders.description.is_empty());
        Ok(())
    }

    #[test]
    fn samples_are_distinct_and_bounded() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = fixture(dir.path())?;

        let schema = extract(&db, ExtractOptions { sample_values: 5 })?;
        let names = schema["customers"].column("name").unwrap();
        assert_eq!(
            names.samples.as_deref(),
            Some(&["Ada".to_string(), "Grace".to_string()][..])
        );

        let schema = extract(&db, ExtractOptions { sample_values: 1 })?;
        assert_eq!(
            schema["customers"].column("name").unwrap().samples.as_ref().map(Vec::len),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn missing_database_is_unavailable() {
        let err = extract(Path::new("/nonexistent/x.db"), ExtractOptions::default()).unwrap_err();
        assert!(matches!(
            crate::errors::try_map_error(&err),
            Some(SqlsageError::DatabaseUnavailable(_))
        ));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
