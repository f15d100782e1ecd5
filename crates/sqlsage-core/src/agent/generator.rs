use super::prompts::sql_prompt;
use crate::model::GoldenSql;
use crate::providers::llm::LlmClient;
use regex::Regex;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

pub struct SqlGenerator {
    llm: Arc<dyn LlmClient>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// One-line SQL for `question`, grounded in `schemas`.
    pub async fn generate(
        &self,
        question: &str,
        schemas: &str,
        examples: &[GoldenSql],
    ) -> anyhow::Result<String> {
        let prompt = sql_prompt(schemas, question, examples);
        let resp = self.llm.complete(&prompt, None).await?;
        let sql = clean_sql(&resp.text);
        tracing::info!(
            event = "sqlsage.generate.sql",
            provider = self.llm.provider_name(),
            model = %resp.model,
            sql = %sql
        );
        Ok(sql)
    }
}

fn fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    // Opening fences may carry a language tag (```sql, ```sqlite).
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z]*").ok()).as_ref()
}

/// Drops markdown fences and folds the statement onto one line.
pub fn clean_sql(raw: &str) -> String {
    let without_fences = match fence() {
        Some(re) => re.replace_all(raw, ""),
        None => Cow::Owned(raw.replace("```", "")),
    };
    without_fences
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}
