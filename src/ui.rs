// Terminal UI utilities: colored output and operator prompts

use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;

use crate::config::RunConfig;
use crate::domain::step::{RunReport, StepStatus};

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

/// Source of operator answers
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Show `message` and return the raw answer
    async fn ask(&self, message: &str) -> std::io::Result<String>;

    /// True only for an explicit `y`/`yes`
    async fn confirm(&self, message: &str) -> std::io::Result<bool> {
        Ok(is_affirmative(&self.ask(message).await?))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Reads answers from stdin
pub struct StdinPrompter;

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&self, message: &str) -> std::io::Result<String> {
        print!("{}", message);
        std::io::stdout().flush()?;

        // Blocking read off the runtime so Ctrl-C is still observed
        tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            Ok(input)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

/// Summary shown at the confirmation gate
pub fn confirmation_summary(config: &RunConfig) -> String {
    let db_type = if config.db_type.as_str().is_empty() {
        "-"
    } else {
        config.db_type.as_str()
    };

    format!(
        "\nYou are about to remove a service\n\
         \x20 • Branch: {}\n\
         \x20 • Ticket Number: {}\n\
         \x20 • SERVICE_NAME: {}\n\
         \x20 • Service is Backend: {} and DB Type is {} (for backend services only)\n\
         Please review the details above.\n\
         Press Y to continue, or N to abort and modify your .env file: ",
        config.source_branch,
        config.ticket_number,
        config.service_name,
        config.backend_service,
        db_type
    )
}

/// Print the per-step outcome table
pub fn print_report(report: &RunReport) {
    println!();
    println!("{}", "Run summary".bold());
    println!("{}", "=".repeat(60));

    for result in &report.results {
        let label = result.status.label();
        let label = match result.status {
            StepStatus::Succeeded => label.green(),
            StepStatus::Skipped => label.dimmed(),
            StepStatus::Partial { .. } => label.yellow(),
            StepStatus::Failed(_) => label.red(),
        };
        println!(
            "   {} {:<40} {:<24} {}",
            result.kind.emoji(),
            result.kind.name(),
            label,
            format!("{:.1}s", result.duration.as_secs_f64()).dimmed()
        );
        if let StepStatus::Failed(reason) = &result.status {
            println!("      {}", reason.red());
        }
    }
    println!();
}
