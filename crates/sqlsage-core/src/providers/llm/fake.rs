use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted client for tests and offline runs.
///
/// Replies are served in order; once the script is exhausted the client
/// answers with its fallback, or echoes the prompt back when it has none. A
/// client built with [`FakeClient::failing`] errors on every call.
pub struct FakeClient {
    model: String,
    script: Mutex<VecDeque<String>>,
    failure: Option<String>,
    fallback: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            failure: None,
            fallback: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(model: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new(model);
        if let Ok(mut script) = client.script.lock() {
            script.extend(replies.into_iter().map(Into::into));
        }
        client
    }

    pub fn failing(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(model)
        }
    }

    /// Fixed reply once the script runs out, e.g. a runnable `SELECT 1` for
    /// an offline SQL model.
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(
        &self,
        prompt: &str,
        _context: Option<&[String]>,
    ) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }

        if let Some(msg) = &self.failure {
            anyhow::bail!("{}", msg);
        }

        let next = self
            .script
            .lock()
            .map_err(|_| anyhow::anyhow!("fake client script poisoned"))?
            .pop_front();

        Ok(LlmResponse {
            text: next
                .or_else(|| self.fallback.clone())
                .unwrap_or_else(|| prompt.to_string()),
            provider: "fake".to_string(),
            model: self.model.clone(),
            cached: false,
            meta: serde_json::json!({}),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
