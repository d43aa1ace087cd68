//! `pim status` command implementation
//!
//! One-shot query of a processing job, for jobs that outlived their import.

use crate::api::{ApiClient, JobStatusReport};
use crate::config::ImportConfig;
use crate::error::Result;
use crate::import::JobStatusSource;
use colored::Colorize;
use pim_common::types::{JobId, JobStatus};

/// Show the current status of `job_id`
pub async fn run(config: &ImportConfig, job_id: &str) -> Result<()> {
    config.validate()?;

    let client = ApiClient::from_config(config)?;
    let job_id = JobId::new(job_id);
    let report = client.job_status(&job_id).await?;

    for line in describe(&job_id, &report) {
        println!("{}", line);
    }

    Ok(())
}

fn describe(job_id: &JobId, report: &JobStatusReport) -> Vec<String> {
    let status = JobStatus::from(report.status);
    let rendered = match status {
        JobStatus::Completed => status.as_str().green().bold(),
        JobStatus::CompletedWithIssues => status.as_str().yellow().bold(),
        JobStatus::Failed => status.as_str().red().bold(),
        _ => status.as_str().cyan().bold(),
    };

    let mut lines = vec![format!("{:<10} {}", "Job:", job_id), format!("{:<10} {}", "Status:", rendered)];

    if let Some(name) = &report.original_file_name {
        lines.push(format!("{:<10} {}", "File:", name));
    }

    if let Some(details) = &report.error_details {
        let details = match details {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{:<10} {}", "Error:", details));
    }

    if status.is_success() && report.result_download_url.is_some() {
        lines.push(String::new());
        lines.push("The result is ready. Start a new import to review and approve it.".to_string());
    } else if !status.is_terminal() {
        lines.push(String::new());
        lines.push("The job is still running. Check again later.".to_string());
    }

    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pim_common::types::ReportedStatus;
    use serde_json::json;

    #[test]
    fn test_describe_running_job() {
        let lines = describe(&JobId::new("J1"), &JobStatusReport::new(ReportedStatus::Processing));
        assert!(lines[0].contains("J1"));
        assert!(lines[1].contains("PROCESSING"));
        assert!(lines.last().unwrap().contains("still running"));
    }

    #[test]
    fn test_describe_failed_job_shows_details() {
        let report = JobStatusReport::new(ReportedStatus::Failed).with_error_details(json!({ "code": 7 }));
        let lines = describe(&JobId::new("J1"), &report);
        assert!(lines.iter().any(|line| line.contains(r#"{"code":7}"#)));
    }
}
