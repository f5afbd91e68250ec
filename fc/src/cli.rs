//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FitCoach - nutrition and fitness coaching pipeline
#[derive(Parser)]
#[command(
    name = "fc",
    about = "Retrieval-grounded nutrition answers and daily or weekly meal/workout plans",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a single question or request a plan
    Ask {
        /// User ID
        #[arg(short, long)]
        user: String,

        /// Generate seven daily plans instead of one
        #[arg(short, long)]
        weekly: bool,

        /// First plan day (YYYY-MM-DD, default today)
        #[arg(short, long)]
        start_date: Option<String>,

        /// The question or request
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Interactive chat session
    Chat {
        /// User ID
        #[arg(short, long)]
        user: String,
    },

    /// Show a user's conversation history
    History {
        /// User ID
        #[arg(short, long)]
        user: String,

        /// Delete the history instead of showing it
        #[arg(long)]
        clear: bool,
    },

    /// List a user's stored plans, newest first
    Plans {
        /// User ID
        #[arg(short, long)]
        user: String,

        /// Plan type (meal, workout, other)
        #[arg(short = 't', long = "type", default_value = "meal")]
        plan_type: String,

        /// Print plan content
        #[arg(short, long)]
        full: bool,
    },

    /// Manage the reference index
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },
}

/// Reference index subcommands
#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Rebuild the index from food records and documents
    Build {
        /// JSON file of food records
        #[arg(short, long)]
        records: Option<PathBuf>,

        /// Document globs or directories
        docs: Vec<String>,
    },

    /// Query the index
    Query {
        /// Query text
        text: String,

        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "fc", "ask", "--user", "u1", "--weekly", "--start-date", "2024-03-01", "weekly", "meal", "plan",
        ])
        .unwrap();

        match cli.command {
            Command::Ask {
                user,
                weekly,
                start_date,
                query,
            } => {
                assert_eq!(user, "u1");
                assert!(weekly);
                assert_eq!(start_date.as_deref(), Some("2024-03-01"));
                assert_eq!(query.join(" "), "weekly meal plan");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fc", "plans", "-u", "u1", "-t", "workout", "-l", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Plans { ref plan_type, .. } if plan_type == "workout"));
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(Cli::try_parse_from(["fc", "ask", "--user", "u1"]).is_err());
    }
}
