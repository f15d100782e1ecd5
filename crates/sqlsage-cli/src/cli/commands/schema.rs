use super::exit_codes;
use crate::cli::args::SchemaArgs;
use sqlsage_core::config::AgentConfig;
use sqlsage_core::errors::{try_map_error, SqlsageError};
use sqlsage_core::schema::{refresh_schema_file, ExtractOptions};

pub fn run(args: SchemaArgs, cfg: &AgentConfig) -> anyhow::Result<i32> {
    let opts = ExtractOptions {
        sample_values: args.samples,
    };
    match refresh_schema_file(&cfg.db_path, &cfg.schema_path, opts) {
        Ok(schema) => {
            let columns: usize = schema.values().map(|t| t.columns.len()).sum();
            eprintln!(
                "wrote {} tables ({} columns) to {}",
                schema.len(),
                columns,
                cfg.schema_path.display()
            );
            Ok(exit_codes::OK)
        }
        Err(e) => match try_map_error(&e) {
            Some(SqlsageError::DatabaseUnavailable(_)) => {
                eprintln!("error: {}", e);
                Ok(exit_codes::FAILED)
            }
            _ => Err(e),
        },
    }
}
