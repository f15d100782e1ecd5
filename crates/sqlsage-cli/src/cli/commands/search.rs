use super::{exit_codes, schema_index, Provider};
use crate::cli::args::SearchArgs;
use sqlsage_core::config::AgentConfig;

pub async fn run(args: SearchArgs, cfg: &AgentConfig, provider: Provider) -> anyhow::Result<i32> {
    let index = schema_index(cfg, provider)?;
    let k = args.k.unwrap_or(cfg.search_k).max(1);
    let found = index.search(&args.query, k).await?;
    if found.is_empty() {
        eprintln!("no schema documents found (is the index built?)");
    } else {
        println!("{}", found);
    }
    Ok(exit_codes::OK)
}
