//! Remote collaborators of the import workflow
//!
//! Each trait is one remote contract. [`ApiClient`](crate::api::ApiClient)
//! implements all of them over HTTP; tests substitute in-memory fakes.

use crate::api::types::{JobStatusReport, UploadTarget};
use crate::error::Result;
use async_trait::async_trait;
use pim_common::types::{JobId, ObjectKey, ProductRow};

/// Upload-credential service plus the object store behind it
#[async_trait]
pub trait UploadService: Send + Sync {
    /// Obtain a write URL for `file_name`. Fails with `Credential`.
    async fn request_upload_target(&self, file_name: &str, content_type: &str) -> Result<UploadTarget>;

    /// Store `bytes` at the target. Fails with `Upload`.
    async fn upload(&self, target: &UploadTarget, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Job-initiation service
#[async_trait]
pub trait JobInitiationService: Send + Sync {
    /// Create one processing job for an uploaded object. Fails with `Initiation`.
    async fn initiate_job(&self, bucket: &str, object_key: &ObjectKey) -> Result<JobId>;
}

/// Job-status service
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Query the current status of a job. Any error is a transient fault.
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport>;
}

/// Storage holding finished result artifacts
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Download the raw artifact behind a result URL. Fails with `ResultFetch`.
    async fn fetch_result(&self, result_url: &str) -> Result<Vec<u8>>;
}

/// Approved-product persistence service
#[async_trait]
pub trait ApprovalService: Send + Sync {
    /// Commit rows of an import. Returns the service's confirmation message.
    async fn approve_products(&self, rows: &[ProductRow], object_key: &ObjectKey) -> Result<Option<String>>;
}

/// Everything an [`ImportSession`](super::ImportSession) needs from the outside
pub trait ImportApi:
    UploadService + JobInitiationService + JobStatusSource + ResultSource + ApprovalService + 'static
{
}

impl<T> ImportApi for T where
    T: UploadService + JobInitiationService + JobStatusSource + ResultSource + ApprovalService + 'static
{
}
