use super::{exit_codes, schema_index, Provider};
use crate::cli::args::IndexArgs;
use sqlsage_core::config::AgentConfig;

pub async fn run(args: IndexArgs, cfg: &AgentConfig, provider: Provider) -> anyhow::Result<i32> {
    let index = schema_index(cfg, provider)?;
    let added = index.build_from_file(&cfg.schema_path, args.rebuild).await?;
    if added == 0 {
        eprintln!(
            "note: no tables in {}; run `sqlsage schema` first",
            cfg.schema_path.display()
        );
    }
    eprintln!(
        "indexed {} documents into {} ({} total)",
        added,
        index.dir().display(),
        index.document_count().await?
    );
    Ok(exit_codes::OK)
}
