//! Interactive chat session

use chrono::NaiveDate;
use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use userstore::PlanType;

use crate::orchestrator::Orchestrator;
use crate::request::QueryRequest;

enum SlashResult {
    Continue,
    Quit,
}

/// Chat loop for one user over a shared orchestrator
pub struct ChatSession<'a> {
    orchestrator: &'a Orchestrator,
    user_id: String,
    weekly: bool,
    start_date: Option<NaiveDate>,
}

impl<'a> ChatSession<'a> {
    pub fn new(orchestrator: &'a Orchestrator, user_id: impl Into<String>) -> Self {
        Self {
            orchestrator,
            user_id: user_id.into(),
            weekly: false,
            start_date: None,
        }
    }

    /// Run until /quit or Ctrl+D
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.ask(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn ask(&self, input: &str) {
        debug!(weekly = self.weekly, "ChatSession::ask: called");
        let mut request = QueryRequest::new(input, self.user_id.as_str()).weekly(self.weekly);
        request.start_date = self.start_date;

        let response = self.orchestrator.handle(&request).await;
        println!("{} {}", "Coach:".bright_blue(), response.response);
        println!();
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "FitCoach Chat".bright_cyan().bold());
        println!("User: {}", self.user_id.cyan());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/weekly" | "/w" => {
                self.weekly = !self.weekly;
                let mode = if self.weekly { "weekly (7 days)" } else { "single day" };
                println!("{} Plan mode: {}", "✓".green(), mode);
            }
            "/date" => match parts.get(1) {
                Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    Ok(date) => {
                        self.start_date = Some(date);
                        println!("{} Plans start on {}", "✓".green(), date);
                    }
                    Err(_) => println!("{} Use YYYY-MM-DD", "?".yellow()),
                },
                None => {
                    self.start_date = None;
                    println!("{} Plans start today", "✓".green());
                }
            },
            "/history" => self.print_history().await,
            "/clear" | "/c" => match self.orchestrator.memory().clear(&self.user_id).await {
                Ok(n) => println!("{}", format!("Cleared {} turns.", n).dimmed()),
                Err(e) => println!("{} {}", "✗".red(), e),
            },
            "/plans" => {
                let plan_type: PlanType = parts.get(1).copied().unwrap_or("meal").parse().unwrap_or(PlanType::Other);
                self.print_plans(plan_type).await;
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:18} Show this help", "/help".yellow());
        println!("  {:18} Exit the chat", "/quit".yellow());
        println!("  {:18} Toggle weekly plan generation", "/weekly".yellow());
        println!("  {:18} Set the first plan day (omit to reset)", "/date [YYYY-MM-DD]".yellow());
        println!("  {:18} Show conversation history", "/history".yellow());
        println!("  {:18} Clear conversation history", "/clear".yellow());
        println!("  {:18} List stored plans", "/plans [meal|workout]".yellow());
        println!();
    }

    async fn print_history(&self) {
        let turns = match self.orchestrator.memory().turns(&self.user_id).await {
            Ok(turns) => turns,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                return;
            }
        };
        if turns.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for turn in turns {
            println!("  {} {}", "User:".bright_green(), turn.user_input);
            println!("  {} {}", "Bot:".bright_blue(), turn.bot_response);
        }
        println!();
    }

    async fn print_plans(&self, plan_type: PlanType) {
        match self.orchestrator.plans().list(&self.user_id, plan_type).await {
            Ok(plans) if plans.is_empty() => println!("{}", format!("No {} plans.", plan_type).dimmed()),
            Ok(plans) => {
                for plan in plans {
                    println!("  {} {}", plan.target_date.to_string().yellow(), plan.id.dimmed());
                }
            }
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }
}
