use super::{exit_codes, schema_index, Provider};
use crate::cli::args::ChatArgs;
use sqlsage_core::config::AgentConfig;
use sqlsage_core::executor::QueryExecutor;
use sqlsage_core::storage::SqliteCheckpointStore;
use sqlsage_core::workflow::{
    CheckpointStore, MemoryCheckpointStore, RunReport, RunStatus, Stage, WorkflowEngine,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Typed instead of a question to confirm the query waiting on this thread.
const RUN_PENDING: &str = "/run";

type Input = Lines<BufReader<Stdin>>;

pub async fn run(args: ChatArgs, cfg: &AgentConfig, provider: Provider) -> anyhow::Result<i32> {
    cfg.ensure_directories()?;
    let engine = build_engine(&args, cfg, provider)?;
    tracing::info!(
        event = "sqlsage.chat.start",
        thread_id = %args.thread,
        db = %cfg.db_path.display(),
        provider = ?provider
    );

    println!("Ask a question about the database. Type 'q' to quit.");
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    // A turn suspended by an earlier session can be confirmed right away.
    if let Err(e) = offer_pending(&engine, &args.thread, &mut input).await {
        eprintln!("error: {:#}", e);
    }

    loop {
        prompt("\nUser: ")?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "q" | "quit" | "exit") {
            println!("Goodbye.");
            break;
        }

        // One bad turn must not end the session.
        let result = if question == RUN_PENDING {
            match offer_pending(&engine, &args.thread, &mut input).await {
                Ok(false) => {
                    println!("No query is waiting for confirmation.");
                    Ok(())
                }
                other => other.map(|_| ()),
            }
        } else {
            turn(&engine, &args.thread, question, &mut input).await
        };
        if let Err(e) = result {
            eprintln!("error: {:#}", e);
        }
    }
    Ok(exit_codes::OK)
}

fn build_engine(
    args: &ChatArgs,
    cfg: &AgentConfig,
    provider: Provider,
) -> anyhow::Result<WorkflowEngine> {
    let checkpoints: Arc<dyn CheckpointStore> = match &args.checkpoint_db {
        Some(path) => Arc::new(SqliteCheckpointStore::open(path)?),
        None => Arc::new(MemoryCheckpointStore::new()),
    };
    Ok(WorkflowEngine::new(
        Arc::new(schema_index(cfg, provider)?),
        provider.sql_llm(cfg)?,
        provider.base_llm(cfg)?,
        QueryExecutor::new(&cfg.db_path),
        checkpoints,
    )
    .with_search_k(cfg.search_k)
    .with_answer_language(&cfg.answer_language))
}

async fn turn(
    engine: &WorkflowEngine,
    thread_id: &str,
    question: &str,
    input: &mut Input,
) -> anyhow::Result<()> {
    let report = engine.invoke(thread_id, question).await?;
    if report.pending() != Some(Stage::Execute) {
        print_outcome(&report);
        return Ok(());
    }

    if let Some(e) = &report.state.error {
        eprintln!("warning: {}", e);
    }
    println!("\nGenerated SQL: {}{}{}", CYAN, report.sql_query(), RESET);
    confirm_and_resume(engine, thread_id, input).await
}

/// Shows the query waiting on `thread_id`, if any, and asks to run it.
/// Returns whether there was one.
async fn offer_pending(
    engine: &WorkflowEngine,
    thread_id: &str,
    input: &mut Input,
) -> anyhow::Result<bool> {
    let Some(cp) = engine.snapshot(thread_id)? else {
        return Ok(false);
    };
    if cp.next != Some(Stage::Execute) {
        return Ok(false);
    }

    if let Some(question) = cp.state.question() {
        println!("\nPending question: {}", question);
    }
    println!("Pending SQL: {}{}{}", CYAN, cp.state.sql_query, RESET);
    confirm_and_resume(engine, thread_id, input).await?;
    Ok(true)
}

async fn confirm_and_resume(
    engine: &WorkflowEngine,
    thread_id: &str,
    input: &mut Input,
) -> anyhow::Result<()> {
    prompt("Run this query? (y/n): ")?;
    let answer = input.next_line().await?.unwrap_or_default();
    if !answer.trim().eq_ignore_ascii_case("y") {
        println!(
            "Query cancelled. Type {} to run it later, or ask a new question.",
            RUN_PENDING
        );
        return Ok(());
    }

    let done = engine.resume(thread_id).await?;
    print_outcome(&done);
    Ok(())
}

fn print_outcome(report: &RunReport) {
    if let Some(rows) = &report.state.query_result {
        println!("\nResult ({} rows):\n{}", rows.len(), rows.render(20));
    }
    if let RunStatus::Failed { error } = &report.status {
        tracing::debug!(event = "sqlsage.chat.turn_failed", error = %error);
    }
    if let Some(answer) = report.answer() {
        println!("\nAssistant: {}", answer);
    }
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}
