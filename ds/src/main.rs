use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;

use docstore::cli::{Cli, Command};
use docstore::config::Config;
use docstore::{BuildOptions, DocStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path.clone());

    info!("docstore starting");
    let store = DocStore::open(&store_path)?;

    match cli.command {
        Command::Build {
            records,
            docs,
            chunk_size,
        } => {
            if records.is_none() && docs.is_empty() {
                return Err(eyre!("Nothing to index: pass --records and/or document paths"));
            }
            let stats = store.build(&BuildOptions {
                food_records: records,
                documents: docs,
                chunk_size: chunk_size.unwrap_or(config.chunk_size),
                record_overlap: config.record_overlap,
                document_overlap: config.document_overlap,
            })?;
            println!(
                "{} Indexed {} chunks ({} food, {} document)",
                "✓".green(),
                stats.chunk_count.to_string().cyan(),
                stats.usda_chunks,
                stats.document_chunks
            );
        }
        Command::Query { text, k } => {
            let hits = store.query(&text, k.unwrap_or(docstore::DEFAULT_TOP_K))?;
            if hits.is_empty() {
                println!("No matches");
            }
            for hit in hits {
                let preview: String = hit.text.chars().take(80).collect();
                println!(
                    "{} {} {:.3} {}",
                    hit.chunk_id.yellow(),
                    hit.source.to_string().dimmed(),
                    hit.score,
                    preview.replace('\n', " ")
                );
            }
        }
        Command::Cat { chunk_id } => {
            println!("{}", store.get_chunk(&chunk_id)?);
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("Index: {}", store_path.display().to_string().cyan());
            println!("  Chunks: {}", stats.chunk_count);
            println!("  Food chunks: {}", stats.usda_chunks);
            println!("  Document chunks: {}", stats.document_chunks);
            println!("  Total chars: {}", stats.total_chars);
        }
    }

    Ok(())
}
