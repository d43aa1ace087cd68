//! Common types used across PIM

mod artifact;

pub use artifact::{AttributeValue, ProductRow, ResultArtifact};

use crate::error::PimError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote import job as tracked by the client.
///
/// `TimedOut` is never reported by the job-status service. The client forces
/// it when the poll budget runs out while the job is still pending or
/// processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    CompletedWithIssues,
    Failed,
    TimedOut,
}

impl JobStatus {
    /// Whether no further status transitions are expected.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    /// Whether the job finished with a downloadable result artifact.
    pub fn is_success(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::CompletedWithIssues)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::CompletedWithIssues => "COMPLETED_WITH_ISSUES",
            JobStatus::Failed => "FAILED",
            JobStatus::TimedOut => "TIMED_OUT",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = PimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "COMPLETED_WITH_ISSUES" => Ok(JobStatus::CompletedWithIssues),
            "FAILED" => Ok(JobStatus::Failed),
            "TIMED_OUT" => Ok(JobStatus::TimedOut),
            _ => Err(PimError::InvalidStatus(s.to_string())),
        }
    }
}

/// Status values the job-status service can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedStatus {
    Pending,
    Processing,
    Completed,
    CompletedWithIssues,
    Failed,
}

impl From<ReportedStatus> for JobStatus {
    fn from(status: ReportedStatus) -> Self {
        match status {
            ReportedStatus::Pending => JobStatus::Pending,
            ReportedStatus::Processing => JobStatus::Processing,
            ReportedStatus::Completed => JobStatus::Completed,
            ReportedStatus::CompletedWithIssues => JobStatus::CompletedWithIssues,
            ReportedStatus::Failed => JobStatus::Failed,
        }
    }
}

/// Identifier of a remote processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of an uploaded object in remote storage (e.g. `uploads/1718-products.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key, if it has a non-empty one.
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
