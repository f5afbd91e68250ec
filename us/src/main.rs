use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use userstore::cli::{Cli, Command, ProfileCommand};
use userstore::config::Config;
use userstore::{PlanType, UserProfile, UserStore};

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
    let db_path = cli.db.unwrap_or(config.db_path);

    info!("userstore starting");
    let mut store = UserStore::open(&db_path)?;

    match cli.command {
        Command::Profile { command } => match command {
            ProfileCommand::Set { user, file } => {
                let content = std::fs::read_to_string(&file).context(format!("Failed to read {}", file.display()))?;
                // YAML is a superset of JSON, so one parser covers both
                let profile: UserProfile = serde_yaml::from_str(&content).context("Failed to parse profile")?;
                store.put_profile(&user, &profile)?;
                println!("{} Stored profile for {}", "✓".green(), user.cyan());
            }
            ProfileCommand::Show { user } => match store.get_profile(&user)? {
                Some(profile) => println!("{}", serde_yaml::to_string(&profile)?),
                None => println!("No profile for {}", user),
            },
        },
        Command::History { user } => {
            let turns = store.history(&user)?;
            if turns.is_empty() {
                println!("No history for {}", user);
            }
            for turn in turns {
                println!("{} {}", "User:".bright_green(), turn.user_input);
                println!("{} {}", "Bot:".bright_blue(), turn.bot_response);
            }
        }
        Command::ClearHistory { user } => {
            let removed = store.clear_history(&user)?;
            println!("{} Removed {} turns for {}", "✓".green(), removed, user);
        }
        Command::Plans { user, plan_type, full } => {
            let plan_type: PlanType = plan_type.parse().unwrap_or(PlanType::Other);
            let plans = store.list_plans(&user, plan_type)?;
            if plans.is_empty() {
                println!("No {} plans for {}", plan_type, user);
            }
            for plan in plans {
                println!(
                    "{} {} {}",
                    plan.target_date.to_string().yellow(),
                    plan.id.dimmed(),
                    plan.plan_type
                );
                if full {
                    println!("{}", serde_json::to_string_pretty(&plan.content)?);
                }
            }
        }
    }

    Ok(())
}
