//! End-to-end tests of an import session against mocked services
//!
//! These tests drive a real `ApiClient` through the whole workflow:
//! - Upload credential, object store, and job initiation
//! - Status polling until a terminal state
//! - Result ingestion and approval

use pim_cli::api::ApiClient;
use pim_cli::config::ApiEndpoints;
use pim_cli::import::{
    ImportEvent, ImportSession, MemorySink, ReviewTab, SelectedFile, SessionPhase, SessionSettings,
};
use pim_cli::ImportError;
use pim_common::types::JobStatus;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn settings(max_polls: u32) -> SessionSettings {
    SessionSettings {
        upload_bucket: "product-portal-uploads".to_string(),
        poll_interval: Duration::from_millis(50),
        max_polls,
        propagation_delay: Duration::ZERO,
    }
}

fn artifact() -> serde_json::Value {
    json!({
        "fileName": "products.csv",
        "originalHeaders": ["ProductSKU", "ProductName", "Colour"],
        "headers": ["ProductSKU", "ProductName"],
        "products": [
            { "ProductSKU": "SKU-1", "ProductName": "Kettle" },
            { "ProductSKU": "SKU-2", "ProductName": "Toaster" }
        ],
        "ignoredHeaders": ["Colour"],
        "validationErrors": []
    })
}

/// Mount the upload and initiation endpoints that every import goes through.
async fn mount_upload_and_initiation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/uploads/presigned-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/storage/products.csv", server.uri()),
            "s3Key": "uploads/products.csv"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/storage/products.csv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/uploads/process-file"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "jobId": "J1" })))
        .expect(1)
        .mount(server)
        .await;
}

fn session(server: &MockServer, max_polls: u32) -> (ImportSession<ApiClient>, Arc<MemorySink>) {
    let api = ApiClient::new(ApiEndpoints::from_base(&server.uri()), Duration::from_secs(5)).unwrap();
    let sink = Arc::new(MemorySink::new());
    let session = ImportSession::new(Arc::new(api), settings(max_polls), sink.clone());
    session.select_file(SelectedFile::new(
        "products.csv",
        None,
        b"ProductSKU,ProductName,Colour\nSKU-1,Kettle,red\n".to_vec(),
    ));
    (session, sink)
}

#[tokio::test]
async fn test_import_review_and_approve() {
    let mock_server = MockServer::start().await;
    mount_upload_and_initiation(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PROCESSING" })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETED",
            "resultDownloadUrl": format!("{}/results/J1.json", mock_server.uri())
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/results/J1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifact()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/approve"))
        .and(body_json(json!({
            "products": [
                { "ProductSKU": "SKU-1", "ProductName": "Kettle" },
                { "ProductSKU": "SKU-2", "ProductName": "Toaster" }
            ],
            "s3Key": "uploads/products.csv"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "2 products saved" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, sink) = session(&mock_server, 24);

    let snapshot = session.run().await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::AwaitingReview);
    assert_eq!(snapshot.job_status, Some(JobStatus::Completed));
    assert_eq!(snapshot.poll_count, 3);
    assert_eq!(snapshot.review_tab, ReviewTab::AcceptedRows);

    let result = snapshot.result.unwrap();
    assert_eq!(result.accepted_count(), 2);
    assert_eq!(result.ignored_headers, vec!["Colour"]);

    let confirmation = session.approve_all().await.unwrap();
    assert_eq!(confirmation.message, "2 products saved");

    let after = session.snapshot();
    assert_eq!(after.phase, SessionPhase::Idle);
    assert!(after.object_key.is_none());
    assert!(after.job_id.is_none());

    let stored = sink
        .position(|e| matches!(e, ImportEvent::ObjectStored { .. }))
        .unwrap();
    let created = sink
        .position(|e| matches!(e, ImportEvent::JobCreated { .. }))
        .unwrap();
    assert!(stored < created);
}

#[tokio::test]
async fn test_import_times_out_after_budget() {
    let mock_server = MockServer::start().await;
    mount_upload_and_initiation(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PENDING" })))
        .expect(4)
        .mount(&mock_server)
        .await;

    let (session, _sink) = session(&mock_server, 4);

    let snapshot = session.run().await.unwrap();
    assert_eq!(snapshot.job_status, Some(JobStatus::TimedOut));
    assert_eq!(snapshot.poll_count, 4);

    // No fifth query once the budget is spent
    tokio::time::sleep(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_failed_job_shows_issue() {
    let mock_server = MockServer::start().await;
    mount_upload_and_initiation(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "errorDetails": { "reason": "no header row" }
        })))
        .mount(&mock_server)
        .await;

    let (session, _sink) = session(&mock_server, 24);

    let snapshot = session.run().await.unwrap();
    let result = snapshot.result.unwrap();

    assert_eq!(snapshot.job_status, Some(JobStatus::Failed));
    assert_eq!(snapshot.review_tab, ReviewTab::Issues);
    assert!(result.accepted_rows.is_empty());
    assert_eq!(result.validation_errors, vec![r#"{"reason":"no header row"}"#]);

    let err = session.approve_all().await.unwrap_err();
    assert!(matches!(err, ImportError::NothingToApprove));
}

#[tokio::test]
async fn test_status_outage_is_absorbed_by_budget() {
    let mock_server = MockServer::start().await;
    mount_upload_and_initiation(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETED",
            "resultDownloadUrl": format!("{}/results/J1.json", mock_server.uri())
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/results/J1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifact()))
        .mount(&mock_server)
        .await;

    let (session, _sink) = session(&mock_server, 24);

    let snapshot = session.run().await.unwrap();
    assert_eq!(snapshot.poll_count, 2);
    assert_eq!(snapshot.job_status, Some(JobStatus::Completed));
}

#[tokio::test]
async fn test_malformed_result_stops_import() {
    let mock_server = MockServer::start().await;
    mount_upload_and_initiation(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/processing-jobs/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETED",
            "resultDownloadUrl": format!("{}/results/J1.json", mock_server.uri())
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/results/J1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "headers": ["ProductSKU"],
            "products": [{ "ProductSKU": "SKU-1", "Weight": 2 }]
        })))
        .mount(&mock_server)
        .await;

    let (session, _sink) = session(&mock_server, 24);

    let err = session.run().await.unwrap_err();
    assert!(matches!(err, ImportError::Stopped(ref m) if m.contains("Weight")));
    assert_eq!(session.snapshot().phase, SessionPhase::Stopped);
}
