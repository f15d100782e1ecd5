use super::Embedder;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns the same vector for every input; ranking falls back to insertion order.
pub struct FakeEmbedder {
    model: String,
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(model: &str, vector: Vec<f32>) -> Self {
        Self {
            model: model.to_string(),
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    fn model_id(&self) -> String {
        format!("fake/{}", self.model)
    }
}
