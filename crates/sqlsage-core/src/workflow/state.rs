use crate::executor::QueryRows;
use crate::model::{GoldenSql, Message, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Append-only conversation history.
    pub messages: Vec<Message>,
    pub relevant_schemas: String,
    pub relevant_golden_sqls: Vec<GoldenSql>,
    pub sql_query: String,
    pub query_result: Option<QueryRows>,
    pub analysis: String,
    pub error: Option<String>,
    /// Reserved; nothing increments it yet.
    pub retry_count: u32,
}

impl WorkflowState {
    /// The most recent user message.
    pub fn question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Field-level merge: every field the update sets replaces the current
    /// value, messages are appended.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(v) = update.relevant_schemas {
            self.relevant_schemas = v;
        }
        if let Some(v) = update.relevant_golden_sqls {
            self.relevant_golden_sqls = v;
        }
        if let Some(v) = update.sql_query {
            self.sql_query = v;
        }
        if let Some(v) = update.query_result {
            self.query_result = v;
        }
        if let Some(v) = update.analysis {
            self.analysis = v;
        }
        if let Some(v) = update.error {
            self.error = v;
        }
        if let Some(v) = update.retry_count {
            self.retry_count = v;
        }
    }
}

/// The fields one stage changed. `None` leaves a field alone; for the
/// optional fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub relevant_schemas: Option<String>,
    pub relevant_golden_sqls: Option<Vec<GoldenSql>>,
    pub sql_query: Option<String>,
    pub query_result: Option<Option<QueryRows>>,
    pub analysis: Option<String>,
    pub error: Option<Option<String>>,
    pub retry_count: Option<u32>,
}

impl StateUpdate {
    pub fn message(m: Message) -> Self {
        Self {
            messages: vec![m],
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Some(error.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    /// Names of the fields this update writes, for trace logging.
    pub fn touched(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.messages.is_empty() {
            out.push("messages");
        }
        if self.relevant_schemas.is_some() {
            out.push("relevant_schemas");
        }
        if self.relevant_golden_sqls.is_some() {
            out.push("relevant_golden_sqls");
        }
        if self.sql_query.is_some() {
            out.push("sql_query");
        }
        if self.query_result.is_some() {
            out.push("query_result");
        }
        if self.analysis.is_some() {
            out.push("analysis");
        }
        if self.error.is_some() {
            out.push("error");
        }
        if self.retry_count.is_some() {
            out.push("retry_count");
        }
        out
    }
}
