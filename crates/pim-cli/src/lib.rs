//! PIM CLI Library
//!
//! Command-line client for importing product spreadsheets into the product
//! information portal.
//!
//! # Overview
//!
//! - **Import**: Upload a file, wait for the processing job, review the
//!   outcome, and approve the accepted rows (`pim import`)
//! - **Status**: Query a processing job by id (`pim status`)
//! - **Configuration**: Show the effective settings (`pim config show`)
//!
//! The import workflow itself lives in [`import`] and can be driven without
//! the CLI through an [`ImportSession`](import::ImportSession).

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod import;
pub mod progress;

// Re-export commonly used types
pub use config::ImportConfig;
pub use error::{ImportError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PIM - Product spreadsheet importer
#[derive(Parser, Debug)]
#[command(name = "pim")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./pim.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API base URL, overriding every configured endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a product spreadsheet, process it, and review the result
    Import {
        /// CSV or Excel file to import
        file: PathBuf,

        /// Approve without asking for confirmation
        #[arg(short = 'y', long = "yes", visible_alias = "approve")]
        yes: bool,

        /// Approve only these rows of the review table (1-based, comma separated)
        #[arg(long, value_delimiter = ',', value_name = "N,N,...")]
        rows: Vec<usize>,
    },

    /// Show the status of a processing job
    Status {
        /// Job id printed by `pim import`
        job_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

impl Cli {
    /// Resolve the configuration: file and environment, then command-line flags.
    pub fn load_config(&self) -> Result<ImportConfig> {
        let mut config = ImportConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.api_url {
            config.api = config::ApiEndpoints::from_base(url);
        }
        Ok(config)
    }
}
