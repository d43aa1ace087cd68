//! PIM CLI - Main entry point

use clap::Parser;
use pim_cli::{Cli, Commands, ConfigCommand};
use pim_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Verbose mode logs debug to the console, otherwise only warnings
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("pim-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> pim_cli::Result<()> {
    let config = cli.load_config()?;

    match &cli.command {
        Commands::Import { file, yes, rows } => {
            pim_cli::commands::import::run(&config, file, *yes, rows).await
        }

        Commands::Status { job_id } => pim_cli::commands::status::run(&config, job_id).await,

        Commands::Config { command } => match command {
            ConfigCommand::Show => pim_cli::commands::config::show(&config, cli.config.as_deref()),
        },
    }
}
