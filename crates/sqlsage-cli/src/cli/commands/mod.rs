use super::args::*;
use sqlsage_core::config::AgentConfig;
use sqlsage_core::index::SchemaIndex;
use sqlsage_core::providers::embedder::{fake::FakeEmbedder, openai::OpenAIEmbedder, Embedder};
use sqlsage_core::providers::llm::{fake::FakeClient, openai::OpenAIClient, LlmClient};
use std::sync::Arc;

pub mod chat;
pub mod config;
pub mod index;
pub mod query;
pub mod schema;
pub mod search;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli, cfg: AgentConfig) -> anyhow::Result<i32> {
    let provider = Provider::parse(&cli.provider)?;
    match cli.cmd {
        Command::Chat(args) => chat::run(args, &cfg, provider).await,
        Command::Schema(args) => schema::run(args, &cfg),
        Command::Index(args) => index::run(args, &cfg, provider).await,
        Command::Search(args) => search::run(args, &cfg, provider).await,
        Command::Query(args) => query::run(args, &cfg),
        Command::Config => config::run(&cfg),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    /// Offline: the SQL model always answers `SELECT 1`, the answer model
    /// echoes its prompt, and every text embeds to the same vector.
    Fake,
}

impl Provider {
    fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "openai" => Ok(Provider::OpenAI),
            "fake" => Ok(Provider::Fake),
            other => anyhow::bail!("unknown provider: {} (expected openai|fake)", other),
        }
    }

    pub fn sql_llm(self, cfg: &AgentConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
        Ok(match self {
            Provider::OpenAI => openai_llm(&cfg.sql_model, cfg)?,
            // Offline runs still need something the database will accept.
            Provider::Fake => {
                Arc::new(FakeClient::new(cfg.sql_model.as_str()).with_fallback(OFFLINE_SQL))
            }
        })
    }

    pub fn base_llm(self, cfg: &AgentConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
        Ok(match self {
            Provider::OpenAI => openai_llm(&cfg.base_model, cfg)?,
            Provider::Fake => Arc::new(FakeClient::new(cfg.base_model.as_str())),
        })
    }

    pub fn embedder(self, cfg: &AgentConfig) -> anyhow::Result<Arc<dyn Embedder>> {
        Ok(match self {
            Provider::OpenAI => Arc::new(
                OpenAIEmbedder::new(cfg.embedding_model.clone(), api_key()?)
                    .with_base_url(cfg.openai_base_url.clone()),
            ),
            Provider::Fake => Arc::new(FakeEmbedder::new(&cfg.embedding_model, vec![1.0, 0.0, 0.0])),
        })
    }
}

pub const OFFLINE_SQL: &str = "SELECT 1";

fn openai_llm(model: &str, cfg: &AgentConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    Ok(Arc::new(
        OpenAIClient::new(model.to_string(), api_key()?).with_base_url(cfg.openai_base_url.clone()),
    ))
}

fn api_key() -> anyhow::Result<String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set (use --provider fake to run offline)"))
}

pub(crate) fn schema_index(cfg: &AgentConfig, provider: Provider) -> anyhow::Result<SchemaIndex> {
    Ok(SchemaIndex::new(&cfg.index_dir, provider.embedder(cfg)?))
}
