//! `pim config` command implementation
//!
//! Shows the configuration the other commands would use.

use crate::config::{ImportConfig, DEFAULT_CONFIG_FILE};
use crate::error::{ImportError, Result};
use colored::Colorize;
use std::path::Path;

/// Environment variables read on top of the configuration file
const ENV_VARS: &[(&str, &str)] = &[
    ("PIM_API_BASE_URL", "Base URL for every endpoint"),
    ("PIM_PRESIGNED_URL", "Upload-credential endpoint"),
    ("PIM_PROCESS_FILE_URL", "Job-initiation endpoint"),
    ("PIM_JOB_STATUS_URL", "Job-status base URL"),
    ("PIM_APPROVE_URL", "Approval endpoint"),
    ("PIM_UPLOAD_BUCKET", "Upload bucket"),
    ("PIM_POLL_INTERVAL_MS", "Time between status checks"),
    ("PIM_MAX_POLLS", "Status checks before timing out"),
    ("PIM_PROPAGATION_DELAY_MS", "Wait after upload"),
    ("PIM_REQUEST_TIMEOUT_SECS", "HTTP request timeout"),
];

/// Show all configuration
pub fn show(config: &ImportConfig, path: Option<&Path>) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| ImportError::config(format!("cannot render configuration: {}", e)))?;

    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    println!("{}", "PIM CLI Configuration:".cyan().bold());
    println!("{:<15} {}", "file:", source);
    println!(
        "{:<15} {}s",
        "poll budget:",
        config.poll_budget().as_secs()
    );
    println!();
    println!("{}", rendered.trim_end());

    if let Err(e) = config.validate() {
        println!();
        println!("{} {}", "⚠".yellow(), e.to_string().yellow());
    }

    println!();
    println!("{}", "Environment Variables:".cyan());
    for (name, description) in ENV_VARS {
        println!("  {:<26} - {}", name, description);
    }

    Ok(())
}
