use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlsage",
    version,
    about = "Ask questions about a SQLite database in plain language"
)]
pub struct Cli {
    /// Config file (defaults to ./sqlsage.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Reject unknown keys in the config file
    #[arg(long, global = true)]
    pub strict_config: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Model and embedding provider (openai|fake)
    #[arg(long, global = true, env = "SQLSAGE_PROVIDER", default_value = "openai")]
    pub provider: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive question/answer loop with SQL confirmation
    Chat(ChatArgs),
    /// Extract the database schema and merge it into the schema file
    Schema(SchemaArgs),
    /// Build the semantic index from the schema file
    Index(IndexArgs),
    /// Show the schema documents retrieved for a question
    Search(SearchArgs),
    /// Run SQL directly against the configured database
    Query(QueryArgs),
    /// Print the resolved configuration
    Config,
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Conversation thread; state is kept per thread
    #[arg(long, default_value = "1")]
    pub thread: String,

    /// Persist conversation checkpoints to this SQLite file
    #[arg(long)]
    pub checkpoint_db: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Distinct example values to record per column (0 = none)
    #[arg(long, default_value_t = 0)]
    pub samples: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// Delete the existing index before building
    #[arg(long)]
    pub rebuild: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    pub query: String,

    /// Documents to consider (defaults to search_k from config)
    #[arg(short = 'k', long)]
    pub k: Option<usize>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    pub sql: String,

    #[arg(long, default_value_t = 50)]
    pub max_rows: usize,
}
