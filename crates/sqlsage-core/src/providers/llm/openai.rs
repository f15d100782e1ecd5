use super::LlmClient;
use crate::model::LlmResponse;
use crate::providers::openai_endpoint;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIClient {
    pub model: String,
    pub api_key: String,
    /// Omitted from the request when `None`; some reasoning models reject it.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            temperature: Some(0.0),
            max_tokens: None,
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, prompt: &str, context: Option<&[String]>) -> serde_json::Value {
        let content = match context {
            Some(ctx) if !ctx.is_empty() => {
                format!("Context:\n{}\n\nQuestion: {}", ctx.join("\n\n"), prompt)
            }
            _ => prompt.to_string(),
        };

        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(n) = self.max_tokens {
            body["max_tokens"] = json!(n);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(
        &self,
        prompt: &str,
        context: Option<&[String]>,
    ) -> anyhow::Result<LlmResponse> {
        let url = openai_endpoint(self.base_url.as_deref(), "chat/completions");
        let body = self.request_body(prompt, context);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI chat API error ({}): {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing content"))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model: self.model.clone(),
            cached: false,
            meta: json!({ "usage": json.get("usage").cloned().unwrap_or_default() }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_skips_unset_sampling_fields() {
        let c = OpenAIClient::new("gpt-5-mini".into(), "k".into()).with_temperature(None);
        let body = c.request_body("hi", None);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn body_inlines_context() {
        let c = OpenAIClient::new("m".into(), "k".into());
        let ctx = vec!["Table: a".to_string(), "Table: b".to_string()];
        let body = c.request_body("q?", Some(&ctx));
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.starts_with("Context:\nTable: a\n\nTable: b"));
        assert!(content.ends_with("Question: q?"));
        assert_eq!(body["temperature"], 0.0);
    }
}
