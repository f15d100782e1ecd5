use super::checkpoint::Stage;
use super::engine::WorkflowEngine;
use super::state::{StateUpdate, WorkflowState};
use crate::agent::prompts::failure_message;
use crate::executor::QueryOutcome;
use crate::model::Message;

pub(crate) const NO_SQL_GENERATED: &str = "No SQL query generated";

impl WorkflowEngine {
    pub(crate) async fn run_stage(&self, stage: Stage, state: &WorkflowState) -> StateUpdate {
        match stage {
            Stage::Retrieve => self.retrieve(state).await,
            Stage::Generate => self.generate(state).await,
            Stage::Execute => self.execute(state),
            Stage::Analyze => self.analyze(state).await,
        }
    }

    /// Looks up schema context for the latest question and resets the
    /// per-turn outputs of any earlier turn.
    async fn retrieve(&self, state: &WorkflowState) -> StateUpdate {
        let question = state.question().unwrap_or_default();

        let schemas = match self.retriever.search_schemas(question, self.search_k).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    event = "sqlsage.stage.retrieve_failed",
                    error = %format!("{:#}", e),
                    "schema search failed; generating without schema context"
                );
                String::new()
            }
        };
        let examples = match self.retriever.search_examples(question).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(event = "sqlsage.stage.examples_failed", error = %e);
                Vec::new()
            }
        };

        StateUpdate {
            relevant_schemas: Some(schemas),
            relevant_golden_sqls: Some(examples),
            query_result: Some(None),
            analysis: Some(String::new()),
            ..StateUpdate::default()
        }
        .clear_error()
    }

    async fn generate(&self, state: &WorkflowState) -> StateUpdate {
        let question = state.question().unwrap_or_default();
        match self
            .generator
            .generate(question, &state.relevant_schemas, &state.relevant_golden_sqls)
            .await
        {
            Ok(sql) => StateUpdate {
                sql_query: Some(sql),
                ..StateUpdate::default()
            }
            .clear_error(),
            Err(e) => {
                let msg = format!("SQL generation failed: {:#}", e);
                tracing::warn!(event = "sqlsage.stage.generation_failed", error = %msg);
                StateUpdate {
                    sql_query: Some(String::new()),
                    ..StateUpdate::default()
                }
                .with_error(msg)
            }
        }
    }

    fn execute(&self, state: &WorkflowState) -> StateUpdate {
        let sql = state.sql_query.trim();
        if sql.is_empty() {
            let msg = match &state.error {
                Some(prev) => format!("{} ({})", NO_SQL_GENERATED, prev),
                None => NO_SQL_GENERATED.to_string(),
            };
            return StateUpdate {
                query_result: Some(None),
                ..StateUpdate::default()
            }
            .with_error(msg);
        }

        tracing::info!(event = "sqlsage.stage.executing", sql = %sql);
        match self.executor.run(sql) {
            QueryOutcome::Rows(rows) => StateUpdate {
                query_result: Some(Some(rows)),
                ..StateUpdate::default()
            }
            .clear_error(),
            QueryOutcome::Failure(f) => StateUpdate {
                query_result: Some(None),
                ..StateUpdate::default()
            }
            .with_error(f.description),
        }
    }

    async fn analyze(&self, state: &WorkflowState) -> StateUpdate {
        let question = state.question().unwrap_or_default();
        let outcome = match (&state.error, &state.query_result) {
            (Some(e), _) => Err(e.as_str()),
            (None, Some(rows)) => Ok(rows),
            (None, None) => Err("no query result available"),
        };
        let failed = outcome.is_err();

        let (content, error) = match self
            .analyzer
            .explain(question, &state.sql_query, outcome)
            .await
        {
            Ok(text) => (text, None),
            Err(e) => {
                let msg = format!("result analysis failed: {:#}", e);
                tracing::warn!(event = "sqlsage.stage.analysis_failed", error = %msg);
                (failure_message(&msg), Some(msg))
            }
        };

        let mut update = StateUpdate {
            messages: vec![Message::assistant(content.clone())],
            analysis: Some(content),
            ..StateUpdate::default()
        };
        if let Some(msg) = error {
            update = update.with_error(msg);
        } else if failed && state.error.is_none() {
            update = update.with_error("no query result available");
        }
        update
    }
}
