use super::document::SchemaDocument;
use crate::embeddings::util::{blob_to_vector, cosine_similarity, sha256_hex, vector_to_blob};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

pub const INDEX_FILE: &str = "index.sqlite3";

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  table_name TEXT NOT NULL,
  content TEXT NOT NULL,
  content_sha256 TEXT NOT NULL,
  model TEXT NOT NULL,
  dims INTEGER NOT NULL,
  vec BLOB NOT NULL,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_sha ON documents(content_sha256, model);
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub table_name: String,
    pub content: String,
    pub score: f64,
}

/// Embedded documents persisted in `<dir>/index.sqlite3`.
pub struct VectorStore {
    conn: Mutex<Connection>,
}

impl VectorStore {
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create index dir {}", dir.display()))?;
        let conn = Connection::open(dir.join(INDEX_FILE)).context("failed to open index db")?;
        conn.execute_batch(DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("index connection poisoned"))
    }

    /// Previously stored vector for identical content under the same model.
    pub fn cached_vector(&self, content: &str, model: &str) -> anyhow::Result<Option<Vec<f32>>> {
        let conn = self.conn()?;
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vec FROM documents WHERE content_sha256 = ?1 AND model = ?2 LIMIT 1",
                params![sha256_hex(content), model],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|b| blob_to_vector(&b)).transpose()
    }

    pub fn add(&self, docs: &[SchemaDocument], vectors: &[Vec<f32>], model: &str) -> anyhow::Result<()> {
        if docs.len() != vectors.len() {
            anyhow::bail!(
                "index error: {} documents but {} vectors",
                docs.len(),
                vectors.len()
            );
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at = chrono::Utc::now().to_rfc3339();
        for (doc, v) in docs.iter().zip(vectors) {
            tx.execute(
                "INSERT INTO documents(table_name, content, content_sha256, model, dims, vec, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    doc.table_name,
                    doc.content,
                    sha256_hex(&doc.content),
                    model,
                    v.len() as i64,
                    vector_to_blob(v),
                    created_at
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT count(*) FROM documents", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Top `k` documents embedded by `model`, by cosine similarity, best
    /// first; ties keep insertion order.
    pub fn similarity_search(
        &self,
        query: &[f32],
        model: &str,
        k: usize,
    ) -> anyhow::Result<Vec<ScoredDocument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT table_name, content, vec FROM documents WHERE model = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![model], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut scored = Vec::new();
        for r in rows {
            let (table_name, content, blob) = r?;
            let v = blob_to_vector(&blob)?;
            let score = cosine_similarity(query, &v)?;
            scored.push(ScoredDocument {
                table_name,
                content,
                score,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}
