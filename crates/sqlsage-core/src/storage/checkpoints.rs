use crate::workflow::{Checkpoint, CheckpointStore, Stage};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Checkpoints that outlive the process, one row per thread plus an
/// append-only history of stage transitions.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).context("failed to open checkpoint db")?;
        Self::init(conn)
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(super::schema::DDL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("checkpoint db connection poisoned"))
    }

    /// `(step, next_stage)` transitions recorded for `thread_id`, oldest first.
    pub fn history(&self, thread_id: &str) -> anyhow::Result<Vec<(u64, Option<Stage>)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT step, next_stage FROM checkpoint_history WHERE thread_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![thread_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (step, next) = r?;
            out.push((step as u64, next.as_deref().map(parse_stage).transpose()?));
        }
        Ok(out)
    }
}

fn parse_stage(s: &str) -> anyhow::Result<Stage> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .with_context(|| format!("unknown stage in checkpoint db: {}", s))
}

impl CheckpointStore for SqliteCheckpointStore {
    fn save(&self, cp: &Checkpoint) -> anyhow::Result<()> {
        let state_json = serde_json::to_string(&cp.state)?;
        let next = cp.next.map(Stage::as_str);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO checkpoints(thread_id, next_stage, step, state_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(thread_id) DO UPDATE SET
                next_stage=excluded.next_stage,
                step=excluded.step,
                state_json=excluded.state_json,
                updated_at=excluded.updated_at",
            params![cp.thread_id, next, cp.step as i64, state_json, cp.updated_at],
        )?;
        tx.execute(
            "INSERT INTO checkpoint_history(thread_id, step, next_stage, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![cp.thread_id, cp.step as i64, next, cp.updated_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT next_stage, step, state_json, updated_at FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((next, step, state_json, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Checkpoint {
            thread_id: thread_id.to_string(),
            state: serde_json::from_str(&state_json)
                .with_context(|| format!("corrupt checkpoint state for thread {}", thread_id))?,
            next: next.as_deref().map(parse_stage).transpose()?,
            step: step as u64,
            updated_at,
        }))
    }
}
