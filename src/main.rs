use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod tools;
mod ui;

use cli::Cli;
use config::RunConfig;
use domain::step::RunReport;
use error::DecomError;
use services::{Collaborators, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env act as environment defaults; real env vars win
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    let config = match RunConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => fail(DecomError::from(e)),
    };

    ui::print_header(&format!("Decommission {}", config.service_name));

    let deps = Collaborators::live(&config)?;
    let workflow = Workflow::new(&config, &deps);
    let mut report = RunReport::default();

    let outcome = tokio::select! {
        result = workflow.run(&mut report) => result,
        _ = tokio::signal::ctrl_c() => Err(DecomError::Interrupted),
    };

    if !report.results.is_empty() {
        ui::print_report(&report);
    }

    match outcome {
        Ok(()) => {
            let failures = report.failures();
            if failures > 0 {
                tracing::warn!(
                    "Completed with {} recoverable failure(s); see the summary above",
                    failures
                );
            }
            Ok(())
        }
        Err(e) => fail(e),
    }
}

/// Print a fatal error and exit with its code
///
/// Exits directly so a prompt still blocked on stdin cannot hold the runtime open.
fn fail(err: DecomError) -> ! {
    ui::print_error(&err.to_string());
    std::process::exit(err.exit_code())
}
