//! Semantic search over schema documents.
//!
//! The index lives in a directory so it can be thrown away and rebuilt
//! wholesale. Building without `rebuild` appends, which is why search
//! deduplicates by table.

use crate::model::GoldenSql;
use crate::providers::embedder::Embedder;
use crate::schema::{load_schema, Schema};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod document;
pub mod vector_store;

pub use document::{documents_for, SchemaDocument};
use vector_store::{ScoredDocument, VectorStore};

/// What the retrieval stage needs from an index.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn search_schemas(&self, query: &str, k: usize) -> anyhow::Result<String>;

    /// Verified question/SQL pairs for few-shot prompting.
    async fn search_examples(&self, query: &str) -> anyhow::Result<Vec<GoldenSql>>;
}

pub struct SchemaIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    // Held across the first open so concurrent searches load the store once.
    store: Mutex<Option<Arc<VectorStore>>>,
}

impl SchemaIndex {
    pub fn new(dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            dir: dir.into(),
            embedder,
            store: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Embeds one document per table and adds it to the index.
    ///
    /// `rebuild` deletes the index directory first. Returns the number of
    /// documents added; zero leaves the index as it was.
    pub async fn build(&self, schema: &Schema, rebuild: bool) -> anyhow::Result<usize> {
        let mut guard = self.store.lock().await;

        if rebuild {
            *guard = None;
            if self.dir.exists() {
                tracing::info!(event = "sqlsage.index.rebuild", dir = %self.dir.display());
                if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                    tracing::warn!(
                        event = "sqlsage.index.rebuild_failed",
                        dir = %self.dir.display(),
                        error = %e,
                        "failed to delete index directory; documents will be appended"
                    );
                }
            }
        }

        let docs = documents_for(schema);
        if docs.is_empty() {
            tracing::warn!(event = "sqlsage.index.no_documents", "no documents to index");
            return Ok(0);
        }

        let store = match guard.take() {
            Some(s) => s,
            None => Arc::new(VectorStore::open(&self.dir)?),
        };

        let model = self.embedder.model_id();
        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(docs.len());
        let mut missing: Vec<String> = Vec::new();
        for doc in &docs {
            let cached = store.cached_vector(&doc.content, &model)?;
            if cached.is_none() {
                missing.push(doc.content.clone());
            }
            vectors.push(cached);
        }

        let mut fresh = self.embedder.embed_batch(&missing).await?.into_iter();
        let vectors: Vec<Vec<f32>> = vectors
            .into_iter()
            .map(|v| match v {
                Some(v) => Ok(v),
                None => fresh
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("embedder returned too few vectors")),
            })
            .collect::<anyhow::Result<_>>()?;

        store.add(&docs, &vectors, &model)?;
        tracing::info!(
            event = "sqlsage.index.built",
            documents = docs.len(),
            embedded = missing.len(),
            model = %model
        );

        *guard = Some(store);
        Ok(docs.len())
    }

    /// Builds from the YAML schema file; a missing file indexes nothing.
    pub async fn build_from_file(&self, schema_path: &Path, rebuild: bool) -> anyhow::Result<usize> {
        if !schema_path.exists() {
            tracing::warn!(
                event = "sqlsage.index.schema_missing",
                path = %schema_path.display(),
                "schema file not found"
            );
        }
        let schema = load_schema(schema_path)?;
        self.build(&schema, rebuild).await
    }

    async fn loaded(&self) -> anyhow::Result<Option<Arc<VectorStore>>> {
        let mut guard = self.store.lock().await;
        if guard.is_none() && VectorStore::exists(&self.dir) {
            tracing::debug!(event = "sqlsage.index.opened", dir = %self.dir.display());
            *guard = Some(Arc::new(VectorStore::open(&self.dir)?));
        }
        Ok(guard.clone())
    }

    pub async fn document_count(&self) -> anyhow::Result<usize> {
        match self.loaded().await? {
            Some(store) => store.len(),
            None => Ok(0),
        }
    }

    /// Up to `k` schema documents, one per table, best match first,
    /// separated by a blank line. Empty when the index was never built.
    pub async fn search(&self, query: &str, k: usize) -> anyhow::Result<String> {
        let Some(store) = self.loaded().await? else {
            tracing::warn!(event = "sqlsage.index.not_built", dir = %self.dir.display());
            return Ok(String::new());
        };

        let model = self.embedder.model_id();
        let qv = self.embedder.embed(query).await?;
        let hits = store.similarity_search(&qv, &model, k)?;
        if hits.is_empty() && !store.is_empty()? {
            tracing::warn!(
                event = "sqlsage.index.model_mismatch",
                dir = %self.dir.display(),
                model = %model,
                "index holds no documents for this embedding model; run `sqlsage index --rebuild`"
            );
        }
        let unique = dedup_by_table(hits);
        tracing::debug!(
            event = "sqlsage.index.searched",
            tables = ?unique.iter().map(|d| d.table_name.as_str()).collect::<Vec<_>>()
        );

        Ok(unique
            .into_iter()
            .map(|d| d.content)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Few-shot example lookup. No example store is consulted yet, so this
    /// is always empty and callers proceed without examples.
    pub async fn search_examples(&self, _query: &str) -> Vec<GoldenSql> {
        Vec::new()
    }
}

/// Keeps the first (highest ranked) hit per table.
fn dedup_by_table(hits: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|d| seen.insert(d.table_name.clone()))
        .collect()
}

#[async_trait]
impl ContextRetriever for SchemaIndex {
    async fn search_schemas(&self, query: &str, k: usize) -> anyhow::Result<String> {
        self.search(query, k).await
    }

    async fn search_examples(&self, query: &str) -> anyhow::Result<Vec<GoldenSql>> {
        Ok(SchemaIndex::search_examples(self, query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(t: &str, c: &str, score: f64) -> ScoredDocument {
        ScoredDocument {
            table_name: t.into(),
            content: c.into(),
            score,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_rank_order() {
        let out = dedup_by_table(vec![
            hit("a", "a-new", 0.9),
            hit("b", "b", 0.8),
            hit("a", "a-old", 0.7),
            hit("c", "c", 0.1),
        ]);
        let got: Vec<_> = out.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(got, vec!["a-new", "b", "c"]);
    }

    #[tokio::test]
    async fn concurrent_first_loads_open_the_store_once() -> anyhow::Result<()> {
        use crate::providers::embedder::fake::FakeEmbedder;

        let dir = tempfile::tempdir()?;
        let embedder = Arc::new(FakeEmbedder::new("e", vec![1.0]));
        let mut schema = Schema::new();
        schema.insert("t".into(), Default::default());
        SchemaIndex::new(dir.path(), embedder.clone())
            .build(&schema, true)
            .await?;

        let index = SchemaIndex::new(dir.path(), embedder);
        let (a, b) = tokio::join!(index.loaded(), index.loaded());
        let (a, b) = (a?.expect("store opened"), b?.expect("store opened"));
        assert!(Arc::ptr_eq(&a, &b));
        Ok(())
    }
}
