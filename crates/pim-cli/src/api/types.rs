//! API request and response types
//!
//! Field names follow the JSON the import services speak (camelCase, with the
//! storage key travelling as `s3Key`).

use pim_common::types::{JobId, ObjectKey, ProductRow, ReportedStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error body returned by the import services on failure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Request for a pre-signed upload URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTargetRequest<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
}

/// Where to store an upload, and the key it will have once stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Pre-signed URL accepting a single `PUT` of the file bytes
    #[serde(rename = "uploadUrl", alias = "uploadTarget")]
    pub upload_url: String,

    #[serde(rename = "s3Key", alias = "objectKey")]
    pub object_key: ObjectKey,
}

/// Request to start processing an uploaded object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateJobRequest<'a> {
    pub s3_bucket: &'a str,
    pub s3_key: &'a ObjectKey,
}

/// Response from the job-initiation service
///
/// Both fields are optional on the wire; a response without `jobId` is a
/// failed initiation whatever its status code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateJobResponse {
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One answer of the job-status service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: ReportedStatus,

    /// Short-lived URL of the result artifact, present once the job succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_download_url: Option<String>,

    /// Free-form failure detail, present when the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
}

impl JobStatusReport {
    pub fn new(status: ReportedStatus) -> Self {
        Self {
            status,
            result_download_url: None,
            error_details: None,
            original_file_name: None,
        }
    }

    pub fn with_result_url(mut self, url: impl Into<String>) -> Self {
        self.result_download_url = Some(url.into());
        self
    }

    pub fn with_error_details(mut self, details: Value) -> Self {
        self.error_details = Some(details);
        self
    }
}

/// Result artifact as stored by the processing service
///
/// Older artifacts name the accepted headers `validHeaders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultArtifactPayload {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub original_headers: Vec<String>,
    #[serde(default)]
    pub headers: Option<Vec<String>>,
    #[serde(default)]
    pub valid_headers: Option<Vec<String>>,
    #[serde(default)]
    pub products: Vec<Map<String, Value>>,
    #[serde(default)]
    pub ignored_headers: Vec<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub total_rows_in_preview: Option<u64>,
}

/// Request committing the approved rows of an import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest<'a> {
    pub products: &'a [ProductRow],
    pub s3_key: &'a ObjectKey,
}

/// Response from the approval service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pim_common::types::AttributeValue;
    use serde_json::json;

    #[test]
    fn test_upload_target_accepts_both_key_spellings() {
        let target: UploadTarget = serde_json::from_value(json!({
            "uploadUrl": "https://bucket.example.com/put?sig=1",
            "s3Key": "uploads/products.csv"
        }))
        .unwrap();
        assert_eq!(target.object_key.as_str(), "uploads/products.csv");

        let target: UploadTarget = serde_json::from_value(json!({
            "uploadTarget": "https://bucket.example.com/put?sig=1",
            "objectKey": "uploads/products.csv"
        }))
        .unwrap();
        assert_eq!(target.upload_url, "https://bucket.example.com/put?sig=1");
    }

    #[test]
    fn test_initiate_request_wire_names() {
        let key = ObjectKey::new("uploads/products.csv");
        let json = serde_json::to_value(InitiateJobRequest {
            s3_bucket: "uploads-bucket",
            s3_key: &key,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "s3Bucket": "uploads-bucket", "s3Key": "uploads/products.csv" })
        );
    }

    #[test]
    fn test_job_status_report_ignores_extra_fields() {
        let report: JobStatusReport = serde_json::from_value(json!({
            "_id": "J1",
            "s3Bucket": "uploads-bucket",
            "status": "FAILED",
            "errorDetails": { "reason": "bad encoding" },
            "submittedAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(report.status, ReportedStatus::Failed);
        assert_eq!(report.error_details, Some(json!({ "reason": "bad encoding" })));
        assert!(report.result_download_url.is_none());
    }

    #[test]
    fn test_approval_request_wire_names() {
        let mut row = ProductRow::new();
        row.insert("ProductSKU", AttributeValue::Text("SKU-1".into()));
        let rows = vec![row];
        let key = ObjectKey::new("uploads/products.csv");

        let json = serde_json::to_value(ApprovalRequest {
            products: &rows,
            s3_key: &key,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "products": [{ "ProductSKU": "SKU-1" }], "s3Key": "uploads/products.csv" })
        );
    }
}
