//! Scripted in-memory implementation of every import collaborator

use crate::api::types::{JobStatusReport, UploadTarget};
use crate::error::{ImportError, Result};
use crate::import::ports::{
    ApprovalService, JobInitiationService, JobStatusSource, ResultSource, UploadService,
};
use async_trait::async_trait;
use pim_common::types::{JobId, ObjectKey, ProductRow, ReportedStatus};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const RESULT_URL: &str = "https://results.test/J1.json";
pub const OBJECT_KEY: &str = "uploads/2024/products.csv";

/// One scripted answer of the status service
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    Report(JobStatusReport),
    TransportError,
}

pub fn pending() -> ScriptedStatus {
    ScriptedStatus::Report(JobStatusReport::new(ReportedStatus::Pending))
}

pub fn processing() -> ScriptedStatus {
    ScriptedStatus::Report(JobStatusReport::new(ReportedStatus::Processing))
}

pub fn completed() -> ScriptedStatus {
    ScriptedStatus::Report(JobStatusReport::new(ReportedStatus::Completed).with_result_url(RESULT_URL))
}

pub fn completed_without_url() -> ScriptedStatus {
    ScriptedStatus::Report(JobStatusReport::new(ReportedStatus::Completed))
}

pub fn failed(details: Value) -> ScriptedStatus {
    ScriptedStatus::Report(JobStatusReport::new(ReportedStatus::Failed).with_error_details(details))
}

pub fn transport_error() -> ScriptedStatus {
    ScriptedStatus::TransportError
}

/// Artifact with two accepted rows, one ignored column, and one validation error
pub fn sample_artifact() -> Value {
    json!({
        "fileName": "products.csv",
        "message": "File processed.",
        "originalHeaders": ["ProductSKU", "ProductName", "Price", "Colour"],
        "headers": ["ProductSKU", "ProductName", "Price"],
        "products": [
            { "ProductSKU": "SKU-1", "ProductName": "Kettle", "Price": 24.5 },
            { "ProductSKU": "SKU-2", "ProductName": "Toaster", "Price": 39 }
        ],
        "ignoredHeaders": ["Colour"],
        "validationErrors": ["Row 4: ProductSKU is required"],
        "totalRowsInPreview": 3
    })
}

#[derive(Default)]
struct Counters {
    upload_target: AtomicUsize,
    upload: AtomicUsize,
    initiate: AtomicUsize,
    status: AtomicUsize,
    status_in_flight: AtomicUsize,
    status_max_in_flight: AtomicUsize,
    fetch: AtomicUsize,
    approve: AtomicUsize,
}

pub struct FakeApi {
    object_key: String,
    job_id: String,
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    artifact: Value,
    credential_error: Option<String>,
    upload_error: Option<String>,
    initiation_error: Option<String>,
    approval_error: Option<String>,
    approval_message: Option<String>,
    upload_delay: Option<Duration>,
    initiation_delay: Option<Duration>,
    status_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    approval_delay: Option<Duration>,
    counters: Counters,
    uploaded: Mutex<Vec<Vec<u8>>>,
    approved: Mutex<Vec<Vec<ProductRow>>>,
}

impl FakeApi {
    /// A service that accepts everything and reports `PENDING` forever.
    pub fn new() -> Self {
        Self {
            object_key: OBJECT_KEY.to_string(),
            job_id: "J1".to_string(),
            statuses: Mutex::new(VecDeque::new()),
            artifact: sample_artifact(),
            credential_error: None,
            upload_error: None,
            initiation_error: None,
            approval_error: None,
            approval_message: None,
            upload_delay: None,
            initiation_delay: None,
            status_delay: None,
            fetch_delay: None,
            approval_delay: None,
            counters: Counters::default(),
            uploaded: Mutex::new(Vec::new()),
            approved: Mutex::new(Vec::new()),
        }
    }

    pub fn with_object_key(mut self, key: &str) -> Self {
        self.object_key = key.to_string();
        self
    }

    pub fn with_job_id(mut self, job_id: &str) -> Self {
        self.job_id = job_id.to_string();
        self
    }

    /// Status answers in order; `PENDING` once the script runs out.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = ScriptedStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into_iter().collect();
        self
    }

    pub fn with_artifact(mut self, artifact: Value) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn failing_credentials(mut self, message: &str) -> Self {
        self.credential_error = Some(message.to_string());
        self
    }

    pub fn failing_upload(mut self, message: &str) -> Self {
        self.upload_error = Some(message.to_string());
        self
    }

    pub fn failing_initiation(mut self, message: &str) -> Self {
        self.initiation_error = Some(message.to_string());
        self
    }

    pub fn failing_approval(mut self, message: &str) -> Self {
        self.approval_error = Some(message.to_string());
        self
    }

    pub fn with_approval_message(mut self, message: &str) -> Self {
        self.approval_message = Some(message.to_string());
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn with_initiation_delay(mut self, delay: Duration) -> Self {
        self.initiation_delay = Some(delay);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn with_approval_delay(mut self, delay: Duration) -> Self {
        self.approval_delay = Some(delay);
        self
    }

    pub fn upload_target_calls(&self) -> usize {
        self.counters.upload_target.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.counters.upload.load(Ordering::SeqCst)
    }

    pub fn initiate_calls(&self) -> usize {
        self.counters.initiate.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.counters.status.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_status_calls(&self) -> usize {
        self.counters.status_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.counters.fetch.load(Ordering::SeqCst)
    }

    pub fn approve_calls(&self) -> usize {
        self.counters.approve.load(Ordering::SeqCst)
    }

    pub fn uploaded_bytes(&self) -> Vec<Vec<u8>> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn approved_rows(&self) -> Vec<Vec<ProductRow>> {
        self.approved.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadService for FakeApi {
    async fn request_upload_target(&self, file_name: &str, _content_type: &str) -> Result<UploadTarget> {
        self.counters.upload_target.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.credential_error {
            return Err(ImportError::credential(message.clone()));
        }

        Ok(UploadTarget {
            upload_url: format!("https://storage.test/put/{}", file_name),
            object_key: ObjectKey::new(self.object_key.clone()),
        })
    }

    async fn upload(&self, _target: &UploadTarget, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.counters.upload.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.upload_error {
            return Err(ImportError::upload(message.clone()));
        }

        self.uploaded.lock().unwrap().push(bytes);
        Ok(())
    }
}

#[async_trait]
impl JobInitiationService for FakeApi {
    async fn initiate_job(&self, _bucket: &str, _object_key: &ObjectKey) -> Result<JobId> {
        self.counters.initiate.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.initiation_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.initiation_error {
            Some(message) => Err(ImportError::initiation(message.clone())),
            None => Ok(JobId::new(self.job_id.clone())),
        }
    }
}

#[async_trait]
impl JobStatusSource for FakeApi {
    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatusReport> {
        self.counters.status.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.counters.status_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .status_max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(pending);

        self.counters.status_in_flight.fetch_sub(1, Ordering::SeqCst);
        match scripted {
            ScriptedStatus::Report(report) => Ok(report),
            ScriptedStatus::TransportError => Err(ImportError::status_query("HTTP 503 Service Unavailable")),
        }
    }
}

#[async_trait]
impl ResultSource for FakeApi {
    async fn fetch_result(&self, result_url: &str) -> Result<Vec<u8>> {
        self.counters.fetch.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if result_url != RESULT_URL {
            return Err(ImportError::result_fetch("HTTP 403 Forbidden"));
        }

        serde_json::to_vec(&self.artifact).map_err(|e| ImportError::result_fetch(e.to_string()))
    }
}

#[async_trait]
impl ApprovalService for FakeApi {
    async fn approve_products(&self, rows: &[ProductRow], _object_key: &ObjectKey) -> Result<Option<String>> {
        self.counters.approve.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.approval_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.approval_error {
            return Err(ImportError::approval(message.clone()));
        }

        self.approved.lock().unwrap().push(rows.to_vec());
        Ok(self.approval_message.clone())
    }
}
