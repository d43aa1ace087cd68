//! API client module
//!
//! HTTP client for the upload, processing, job-status, and approval services.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::ApiClient;
pub use types::*;
