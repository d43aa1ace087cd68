//! HTTP API client for the import services
//!
//! Implements every collaborator trait of the import workflow with `reqwest`.
//! Non-2xx answers are mapped to the error variant of the step that made the
//! call, using the service's `{ "error": ... }` body when it sent one.

use crate::api::{endpoints, types::*};
use crate::config::{ApiEndpoints, ImportConfig};
use crate::error::{ImportError, Result};
use crate::import::ports::{
    ApprovalService, JobInitiationService, JobStatusSource, ResultSource, UploadService,
};
use async_trait::async_trait;
use pim_common::types::{JobId, ObjectKey, ProductRow};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

/// Upload error bodies are truncated to this many characters.
const UPLOAD_ERROR_SNIPPET_CHARS: usize = 100;

/// API client for the import services
pub struct ApiClient {
    client: Client,
    endpoints: ApiEndpoints,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(endpoints: ApiEndpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    /// Create a client for the endpoints and timeout of `config`
    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Self::new(config.api.clone(), config.request_timeout())
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }
}

/// Pull a human-readable message out of a failed response.
async fn error_message(response: Response, fallback: &str) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            error: Some(message),
        }) if !message.trim().is_empty() => message,
        _ => format!("{} ({})", fallback, describe_status(status)),
    }
}

fn describe_status(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

#[async_trait]
impl UploadService for ApiClient {
    #[instrument(skip(self))]
    async fn request_upload_target(&self, file_name: &str, content_type: &str) -> Result<UploadTarget> {
        let response = self
            .client
            .post(&self.endpoints.presigned_url)
            .json(&UploadTargetRequest {
                file_name,
                content_type,
            })
            .send()
            .await
            .map_err(|e| ImportError::credential(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImportError::credential(
                error_message(response, "Failed to get pre-signed URL").await,
            ));
        }

        let target: UploadTarget = response
            .json()
            .await
            .map_err(|e| ImportError::credential(format!("unexpected response: {}", e)))?;

        debug!(object_key = %target.object_key, "Received upload target");
        Ok(target)
    }

    #[instrument(skip(self, target, bytes), fields(object_key = %target.object_key, size = bytes.len()))]
    async fn upload(&self, target: &UploadTarget, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .client
            .put(&target.upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ImportError::upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(UPLOAD_ERROR_SNIPPET_CHARS).collect();
            return Err(ImportError::upload(
                format!("{}. {}", describe_status(status), snippet.trim())
                    .trim_end()
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl JobInitiationService for ApiClient {
    #[instrument(skip(self))]
    async fn initiate_job(&self, bucket: &str, object_key: &ObjectKey) -> Result<JobId> {
        let response = self
            .client
            .post(&self.endpoints.process_file_url)
            .json(&InitiateJobRequest {
                s3_bucket: bucket,
                s3_key: object_key,
            })
            .send()
            .await
            .map_err(|e| ImportError::initiation(e.to_string()))?;

        let status = response.status();
        // The service may answer 2xx without a job id; the body decides.
        let body: InitiateJobResponse = response.json().await.unwrap_or_default();

        match body.job_id {
            Some(job_id) if status.is_success() && !job_id.as_str().is_empty() => Ok(job_id),
            _ => Err(ImportError::initiation(body.error.unwrap_or_else(|| {
                format!(
                    "Failed to initiate file processing ({})",
                    describe_status(status)
                )
            }))),
        }
    }
}

#[async_trait]
impl JobStatusSource for ApiClient {
    #[instrument(skip(self))]
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport> {
        let url = endpoints::job_status_url(&self.endpoints.job_status_base, job_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ImportError::status_query(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::status_query(describe_status(status)));
        }

        response
            .json()
            .await
            .map_err(|e| ImportError::status_query(format!("unreadable status: {}", e)))
    }
}

#[async_trait]
impl ResultSource for ApiClient {
    #[instrument(skip_all)]
    async fn fetch_result(&self, result_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(result_url)
            .send()
            .await
            .map_err(|e| ImportError::result_fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::result_fetch(describe_status(status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImportError::result_fetch(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ApprovalService for ApiClient {
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn approve_products(&self, rows: &[ProductRow], object_key: &ObjectKey) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.endpoints.approve_url)
            .json(&ApprovalRequest {
                products: rows,
                s3_key: object_key,
            })
            .send()
            .await
            .map_err(|e| ImportError::approval(e.to_string()))?;

        let status = response.status();
        let body: ApprovalResponse = response.json().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ImportError::approval(body.error.unwrap_or_else(|| {
                format!("Failed to approve products ({})", describe_status(status))
            })));
        }

        Ok(body.message)
    }
}
