//! CLI argument parsing for docstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ds")]
#[command(author, version, about = "Local nutrition reference index", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Index directory (overrides config)
    #[arg(long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the index from food records and reference documents
    Build {
        /// JSON array of USDA food records
        #[arg(short, long)]
        records: Option<PathBuf>,

        /// Document directories or glob patterns
        docs: Vec<String>,

        /// Chunk size in characters
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,
    },

    /// Rank chunks against a query
    Query {
        /// Query text
        #[arg(required = true)]
        text: String,

        /// Maximum results to return
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Display a chunk's content
    Cat {
        /// Chunk ID to display
        #[arg(required = true)]
        chunk_id: String,
    },

    /// Show index statistics
    Stats,
}
