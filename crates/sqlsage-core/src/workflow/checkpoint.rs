use super::state::WorkflowState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieve,
    Generate,
    Execute,
    Analyze,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Retrieve => Some(Stage::Generate),
            Stage::Generate => Some(Stage::Execute),
            Stage::Execute => Some(Stage::Analyze),
            Stage::Analyze => None,
        }
    }

    /// Stages that need explicit confirmation before they run.
    pub fn interrupts_before(self) -> bool {
        matches!(self, Stage::Execute)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Retrieve => "retrieve",
            Stage::Generate => "generate",
            Stage::Execute => "execute",
            Stage::Analyze => "analyze",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread state plus where the pipeline stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub state: WorkflowState,
    /// Stage waiting to run; `None` once a turn has finished.
    pub next: Option<Stage>,
    /// Number of stage completions recorded for this thread.
    pub step: u64,
    pub updated_at: String,
}

impl Checkpoint {
    pub fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            state: WorkflowState::default(),
            next: None,
            step: 0,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.next.is_some()
    }
}

/// Persistence for checkpoints, addressed by thread id.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()>;
    fn load(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>>;
}

/// Process-lifetime store; state disappears with the process.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("checkpoint store poisoned"))?;
        map.insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn load(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>> {
        let map = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("checkpoint store poisoned"))?;
        Ok(map.get(thread_id).cloned())
    }
}
