//! CLI argument parsing for userstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "us")]
#[command(author, version, about = "Per-user profile, history and plan storage", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Show a user's chat history
    History {
        /// User ID
        #[arg(short, long, required = true)]
        user: String,
    },

    /// Delete a user's chat history
    ClearHistory {
        /// User ID
        #[arg(short, long, required = true)]
        user: String,
    },

    /// List a user's stored plans
    Plans {
        /// User ID
        #[arg(short, long, required = true)]
        user: String,

        /// Plan type (meal, workout, other)
        #[arg(short = 't', long = "type", default_value = "meal")]
        plan_type: String,

        /// Print full plan content as JSON
        #[arg(long)]
        full: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create or replace a profile from a YAML or JSON file
    Set {
        /// User ID
        #[arg(short, long, required = true)]
        user: String,

        /// Profile file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Print a user's profile
    Show {
        /// User ID
        #[arg(short, long, required = true)]
        user: String,
    },
}
