use super::prompts::{analysis_prompt, failure_message};
use crate::executor::QueryRows;
use crate::providers::llm::LlmClient;
use std::sync::Arc;

/// Rows sent to the model are capped; the prompt says how many were left out.
const MAX_PROMPT_ROWS: usize = 200;

pub struct ResultAnalyzer {
    llm: Arc<dyn LlmClient>,
    language: String,
}

impl ResultAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Explains `outcome` in prose.
    ///
    /// A failure is rendered from a fixed template without calling the
    /// model. Rows go through exactly one completion; its error is returned
    /// to the caller untouched.
    pub async fn explain(
        &self,
        question: &str,
        sql: &str,
        outcome: Result<&QueryRows, &str>,
    ) -> anyhow::Result<String> {
        let rows = match outcome {
            Err(error) => return Ok(failure_message(error)),
            Ok(rows) => rows,
        };

        let data = rows.render(MAX_PROMPT_ROWS);
        let prompt = analysis_prompt(question, sql, &data, &self.language);
        let resp = self.llm.complete(&prompt, None).await?;
        tracing::info!(
            event = "sqlsage.analyze.done",
            provider = self.llm.provider_name(),
            model = %resp.model,
            rows = rows.len()
        );
        Ok(resp.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::FakeClient;

    #[tokio::test]
    async fn failure_skips_the_model() -> anyhow::Result<()> {
        let llm = Arc::new(FakeClient::new("base"));
        let a = ResultAnalyzer::new(llm.clone(), "English");
        let text = a
            .explain("who?", "SELECT * FROM staff", Err("no such table: staff"))
            .await?;
        assert!(text.contains("no such table: staff"));
        assert_eq!(llm.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn rows_are_sent_with_question_and_language() -> anyhow::Result<()> {
        let llm = Arc::new(FakeClient::with_replies("base", ["There are two employees."]));
        let a = ResultAnalyzer::new(llm.clone(), "Korean");
        let rows = QueryRows {
            columns: vec!["name".into()],
            rows: vec![vec!["Ada".into()], vec!["Linus".into()]],
        };

        let text = a
            .explain("list names", "SELECT name FROM employees", Ok(&rows))
            .await?;
        assert_eq!(text, "There are two employees.");

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("in Korean"));
        assert!(prompt.contains("Question: list names"));
        assert!(prompt.contains("name\nAda\nLinus"));
        Ok(())
    }
}
