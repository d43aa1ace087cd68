//! API endpoint URL builders

use pim_common::types::JobId;

/// Build the status URL of a single job
///
/// The job id is appended as one path segment; characters that would change
/// the path are percent-encoded.
pub fn job_status_url(job_status_base: &str, job_id: &JobId) -> String {
    format!(
        "{}/{}",
        job_status_base.trim_end_matches('/'),
        urlencoding::encode(job_id.as_str())
    )
}
