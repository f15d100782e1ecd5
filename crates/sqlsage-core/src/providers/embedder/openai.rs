use super::Embedder;
use crate::providers::openai_endpoint;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIEmbedder {
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    async fn request(&self, input: serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = openai_endpoint(self.base_url.as_deref(), "embeddings");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": input }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embeddings API error ({}): {}", status, error_text);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_embeddings(&body)
    }
}

fn parse_embeddings(body: &serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
    let data = body
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings response missing data"))?;

    // The API may return items out of order; `index` is authoritative.
    let mut items: Vec<(u64, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let idx = item.get("index").and_then(|v| v.as_u64()).unwrap_or(pos as u64);
        let vector = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings item {} missing embedding", idx))?
            .iter()
            .map(|x| {
                x.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow::anyhow!("embedding contains non-numeric value"))
            })
            .collect::<anyhow::Result<Vec<f32>>>()?;
        items.push((idx, vector));
    }
    items.sort_by_key(|(idx, _)| *idx);
    Ok(items.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.request(json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("OpenAI embeddings response was empty"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let out = self.request(json!(texts)).await?;
        if out.len() != texts.len() {
            anyhow::bail!(
                "OpenAI embeddings returned {} vectors for {} inputs",
                out.len(),
                texts.len()
            );
        }
        Ok(out)
    }

    fn model_id(&self) -> String {
        format!("openai/{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_respects_index_order() -> anyhow::Result<()> {
        let body = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let v = parse_embeddings(&body)?;
        assert_eq!(v, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        Ok(())
    }

    #[test]
    fn parse_rejects_missing_data() {
        assert!(parse_embeddings(&json!({ "error": "nope" })).is_err());
    }
}
