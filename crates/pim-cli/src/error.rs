//! Error types for the PIM import controller
//!
//! Every variant is user-facing: the message says which step failed and, where
//! there is one, what the operator can do about it.

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Error type for the import workflow and the CLI around it
///
/// A failed job or a poll timeout is not an error; both are terminal session
/// states that the operator reviews like any other outcome.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The upload-credential service refused to hand out an upload URL
    #[error("Could not obtain an upload URL: {0}. Check the presigned-url endpoint in your configuration.")]
    Credential(String),

    /// Storing the file bytes at the upload URL failed
    #[error("File upload failed: {0}")]
    Upload(String),

    /// The processing service did not create a job
    #[error("Could not start processing: {0}. Start a new import to try again.")]
    Initiation(String),

    /// A single job-status query failed; absorbed by the poll budget
    #[error("Job status query failed: {0}")]
    StatusQuery(String),

    /// The job reported success but its result could not be retrieved
    #[error("Could not retrieve the processing result: {0}")]
    ResultFetch(String),

    /// The result artifact was retrieved but is malformed
    #[error("Processing result is malformed: {0}")]
    ResultParse(String),

    /// The persistence service rejected the approved rows
    #[error("Approval failed: {0}")]
    Approval(String),

    /// Approval was requested with no rows
    #[error("No valid products to approve.")]
    NothingToApprove,

    /// `start` was called before a file was selected
    #[error("No file selected. Choose a CSV or Excel file first.")]
    NoFileSelected,

    /// The chosen file is not a spreadsheet the service accepts
    #[error("Unsupported file '{0}'. Expected a .csv, .xlsx, or .xls file.")]
    UnsupportedFile(String),

    /// The operation does not fit the current session phase
    #[error("Import is not ready for this step: {0}")]
    InvalidState(String),

    /// The row selection given on the command line does not match the result
    #[error("Invalid row selection: {0}. Row numbers start at 1 and must exist in the review table.")]
    InvalidSelection(String),

    /// The session was reset while this step was in flight
    #[error("The import was reset while this step was in flight; its result was discarded.")]
    Superseded,

    /// The automated flow stopped after a background step failed
    #[error("Import stopped: {0}")]
    Stopped(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your PIM_* environment variables or pim.toml.")]
    Config(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check the file path and read permissions.")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be constructed
    #[error("Network client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Interactive prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),
}

impl ImportError {
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn initiation(msg: impl Into<String>) -> Self {
        Self::Initiation(msg.into())
    }

    pub fn status_query(msg: impl Into<String>) -> Self {
        Self::StatusQuery(msg.into())
    }

    pub fn result_fetch(msg: impl Into<String>) -> Self {
        Self::ResultFetch(msg.into())
    }

    pub fn result_parse(msg: impl Into<String>) -> Self {
        Self::ResultParse(msg.into())
    }

    pub fn approval(msg: impl Into<String>) -> Self {
        Self::Approval(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
