use super::exit_codes;
use crate::cli::args::QueryArgs;
use sqlsage_core::config::AgentConfig;
use sqlsage_core::executor::{QueryExecutor, QueryOutcome};

pub fn run(args: QueryArgs, cfg: &AgentConfig) -> anyhow::Result<i32> {
    match QueryExecutor::new(&cfg.db_path).run(&args.sql) {
        QueryOutcome::Rows(rows) => {
            println!("{}", rows.render(args.max_rows));
            eprintln!("({} rows)", rows.len());
            Ok(exit_codes::OK)
        }
        QueryOutcome::Failure(f) => {
            eprintln!("query failed: {}", f);
            Ok(exit_codes::FAILED)
        }
    }
}
