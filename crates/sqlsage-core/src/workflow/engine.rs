use super::checkpoint::{Checkpoint, CheckpointStore, Stage};
use super::state::{StateUpdate, WorkflowState};
use crate::agent::{ResultAnalyzer, SqlGenerator};
use crate::errors::SqlsageError;
use crate::executor::QueryExecutor;
use crate::index::ContextRetriever;
use crate::model::Message;
use crate::providers::llm::LlmClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Stopped before `pending`; call [`WorkflowEngine::resume`] to continue.
    Suspended { pending: Stage },
    Completed,
    /// The turn finished, but its answer is an error explanation.
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub thread_id: String,
    pub status: RunStatus,
    /// Stages that ran during this call, in order.
    pub executed: Vec<Stage>,
    pub state: WorkflowState,
}

impl RunReport {
    pub fn pending(&self) -> Option<Stage> {
        match self.status {
            RunStatus::Suspended { pending } => Some(pending),
            _ => None,
        }
    }

    pub fn sql_query(&self) -> &str {
        &self.state.sql_query
    }

    pub fn answer(&self) -> Option<&str> {
        self.state.last_answer()
    }
}

pub struct WorkflowEngine {
    pub(crate) retriever: Arc<dyn ContextRetriever>,
    pub(crate) generator: SqlGenerator,
    pub(crate) executor: QueryExecutor,
    pub(crate) analyzer: ResultAnalyzer,
    pub(crate) search_k: usize,
    checkpoints: Arc<dyn CheckpointStore>,
    // One turn at a time per thread id; entries live while a call is in flight.
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WorkflowEngine {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        sql_llm: Arc<dyn LlmClient>,
        base_llm: Arc<dyn LlmClient>,
        executor: QueryExecutor,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            retriever,
            generator: SqlGenerator::new(sql_llm),
            executor,
            analyzer: ResultAnalyzer::new(base_llm, "English"),
            search_k: 10,
            checkpoints,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_search_k(mut self, k: usize) -> Self {
        self.search_k = k.max(1);
        self
    }

    pub fn with_answer_language(mut self, language: &str) -> Self {
        self.analyzer = self.analyzer.with_language(language);
        self
    }

    /// Current checkpoint for `thread_id`, including the pending stage.
    pub fn snapshot(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>> {
        self.checkpoints.load(thread_id)
    }

    /// Starts a turn with a new user message.
    ///
    /// Runs retrieve and generate, then stops before execute. A turn left
    /// suspended on this thread is abandoned.
    pub async fn invoke(&self, thread_id: &str, message: &str) -> anyhow::Result<RunReport> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _turn = lock.lock().await;
            self.start_turn(thread_id, message).await
        };
        self.release_thread_lock(thread_id, lock).await;
        result
    }

    async fn start_turn(&self, thread_id: &str, message: &str) -> anyhow::Result<RunReport> {
        let mut cp = self
            .checkpoints
            .load(thread_id)?
            .unwrap_or_else(|| Checkpoint::new(thread_id));

        if let Some(pending) = cp.next {
            tracing::info!(
                event = "sqlsage.workflow.abandoned",
                thread_id = %thread_id,
                pending = %pending,
                "new message replaces the pending turn"
            );
        }

        cp.state.apply(StateUpdate::message(Message::user(message)));
        cp.next = Some(Stage::Retrieve);
        self.save(&mut cp)?;

        self.run_from(cp, Stage::Retrieve, false).await
    }

    /// Confirms the pending stage and runs the rest of the turn.
    pub async fn resume(&self, thread_id: &str) -> anyhow::Result<RunReport> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _turn = lock.lock().await;
            self.continue_turn(thread_id).await
        };
        self.release_thread_lock(thread_id, lock).await;
        result
    }

    async fn continue_turn(&self, thread_id: &str) -> anyhow::Result<RunReport> {
        let cp = self
            .checkpoints
            .load(thread_id)?
            .ok_or_else(|| SqlsageError::NothingPending(thread_id.to_string()))?;
        let Some(stage) = cp.next else {
            return Err(SqlsageError::NothingPending(thread_id.to_string()).into());
        };

        tracing::info!(event = "sqlsage.workflow.resumed", thread_id = %thread_id, stage = %stage);
        self.run_from(cp, stage, true).await
    }

    async fn run_from(
        &self,
        mut cp: Checkpoint,
        start: Stage,
        confirmed: bool,
    ) -> anyhow::Result<RunReport> {
        let mut executed = Vec::new();
        let mut next = Some(start);

        while let Some(stage) = next {
            // Only the stage the caller confirmed may pass its gate.
            let approved = confirmed && executed.is_empty() && stage == start;
            if stage.interrupts_before() && !approved {
                cp.next = Some(stage);
                self.save(&mut cp)?;
                tracing::info!(
                    event = "sqlsage.workflow.suspended",
                    thread_id = %cp.thread_id,
                    pending = %stage,
                    sql = %cp.state.sql_query
                );
                return Ok(RunReport {
                    thread_id: cp.thread_id,
                    status: RunStatus::Suspended { pending: stage },
                    executed,
                    state: cp.state,
                });
            }

            let update = self.run_stage(stage, &cp.state).await;
            tracing::info!(
                event = "sqlsage.workflow.stage_done",
                thread_id = %cp.thread_id,
                stage = %stage,
                wrote = ?update.touched()
            );
            cp.state.apply(update);
            next = stage.next();
            cp.next = next;
            cp.step += 1;
            self.save(&mut cp)?;
            executed.push(stage);
        }

        let status = match &cp.state.error {
            Some(e) => RunStatus::Failed { error: e.clone() },
            None => RunStatus::Completed,
        };
        tracing::info!(
            event = "sqlsage.workflow.finished",
            thread_id = %cp.thread_id,
            failed = matches!(status, RunStatus::Failed { .. })
        );

        Ok(RunReport {
            thread_id: cp.thread_id,
            status,
            executed,
            state: cp.state,
        })
    }

    fn save(&self, cp: &mut Checkpoint) -> anyhow::Result<()> {
        cp.updated_at = chrono::Utc::now().to_rfc3339();
        self.checkpoints.save(cp)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forgets the lock once no other call holds or waits on it, so the map
    /// only holds threads with a call in flight.
    async fn release_thread_lock(&self, thread_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.thread_locks.lock().await;
        // Clones are only handed out under the map lock: two means the map and us.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(thread_id);
        }
    }
}
