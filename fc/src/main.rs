//! FitCoach CLI entry point

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use docstore::{BuildOptions, DocStore};
use fitcoach::cli::{Cli, Command, IndexCommand};
use fitcoach::config::Config;
use fitcoach::orchestrator::Orchestrator;
use fitcoach::repl::ChatSession;
use fitcoach::request::{QueryRequest, RawQuery};
use fitcoach::state::StateManager;
use userstore::PlanType;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging isn't initialized yet, so problems go to stderr
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("fitcoach.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "FitCoach loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Ask {
            user,
            weekly,
            start_date,
            query,
        } => cmd_ask(&config, user, weekly, start_date, query.join(" ")).await,
        Command::Chat { user } => cmd_chat(&config, &user).await,
        Command::History { user, clear } => cmd_history(&config, &user, clear).await,
        Command::Plans { user, plan_type, full } => cmd_plans(&config, &user, &plan_type, full).await,
        Command::Index { command } => cmd_index(&config, command),
    }
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    config.validate()?;
    let root = std::env::current_dir().context("Failed to read working directory")?;
    Orchestrator::from_config(config, root)
}

/// Answer one request
async fn cmd_ask(
    config: &Config,
    user: String,
    weekly: bool,
    start_date: Option<String>,
    query: String,
) -> Result<()> {
    debug!(%user, weekly, ?start_date, "cmd_ask: called");
    let raw = RawQuery {
        query: Some(query),
        user_id: Some(user),
        is_weekly: Some(serde_json::Value::Bool(weekly)),
        start_date,
    };
    let request = QueryRequest::try_from(raw)?;

    let orchestrator = build_orchestrator(config)?;
    let response = orchestrator.handle(&request).await;
    println!("{}", response.response);

    orchestrator.state().shutdown().await.ok();
    Ok(())
}

/// Interactive chat
async fn cmd_chat(config: &Config, user: &str) -> Result<()> {
    debug!(%user, "cmd_chat: called");
    let orchestrator = build_orchestrator(config)?;
    ChatSession::new(&orchestrator, user).run().await?;
    orchestrator.state().shutdown().await.ok();
    Ok(())
}

/// Show or clear conversation history
async fn cmd_history(config: &Config, user: &str, clear: bool) -> Result<()> {
    debug!(%user, clear, "cmd_history: called");
    let state = StateManager::spawn(&config.storage.db_path)?;

    if clear {
        let removed = state.clear_history(user).await?;
        println!("{} Removed {} turns for {}", "✓".green(), removed, user);
    } else {
        let turns = state.history(user).await?;
        if turns.is_empty() {
            println!("No history for {}", user);
        }
        for turn in turns {
            println!("{} {}", "User:".bright_green(), turn.user_input);
            println!("{} {}", "Bot:".bright_blue(), turn.bot_response);
        }
    }

    state.shutdown().await.ok();
    Ok(())
}

/// List stored plans
async fn cmd_plans(config: &Config, user: &str, plan_type: &str, full: bool) -> Result<()> {
    debug!(%user, %plan_type, full, "cmd_plans: called");
    let plan_type: PlanType = plan_type.parse().unwrap_or(PlanType::Other);
    let state = StateManager::spawn(&config.storage.db_path)?;

    let plans = state.list_plans(user, plan_type).await?;
    if plans.is_empty() {
        println!("No {} plans for {}", plan_type, user);
    }
    for plan in plans {
        println!("{} {}", plan.target_date.to_string().yellow(), plan.id.dimmed());
        if full {
            println!("{}", serde_json::to_string_pretty(&plan.content)?);
        }
    }

    state.shutdown().await.ok();
    Ok(())
}

/// Build or query the reference index
fn cmd_index(config: &Config, command: IndexCommand) -> Result<()> {
    debug!(?command, "cmd_index: called");
    let store = DocStore::open(&config.retrieval.index_dir)?;

    match command {
        IndexCommand::Build { records, docs } => {
            if records.is_none() && docs.is_empty() {
                eyre::bail!("Nothing to index: pass --records and/or document paths");
            }
            let stats = store.build(&BuildOptions {
                food_records: records,
                documents: docs,
                ..Default::default()
            })?;
            println!(
                "{} Indexed {} chunks ({} food, {} document)",
                "✓".green(),
                stats.chunk_count,
                stats.usda_chunks,
                stats.document_chunks
            );
        }
        IndexCommand::Query { text, k } => {
            let hits = store.query(&text, k.unwrap_or(config.retrieval.top_k))?;
            if hits.is_empty() {
                println!("No matches");
            }
            for hit in hits {
                let preview: String = hit.text.chars().take(120).collect();
                println!(
                    "{} {:.3} [{}] {}",
                    hit.chunk_id.cyan(),
                    hit.score,
                    hit.source,
                    preview.replace('\n', " ")
                );
            }
        }
    }
    Ok(())
}
