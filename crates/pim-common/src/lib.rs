//! PIM Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the PIM product-import tools.
//!
//! # Overview
//!
//! This crate provides common functionality used across the PIM workspace:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Types**: Job status values, typed product rows, and the normalized
//!   result artifact produced by the remote validation service
//! - **Logging**: Centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use pim_common::types::{JobStatus, ProductRow};
//! use pim_common::Result;
//!
//! fn accepted(row_json: &serde_json::Map<String, serde_json::Value>) -> Result<ProductRow> {
//!     let headers = vec!["ProductSKU".to_string(), "ProductName".to_string()];
//!     ProductRow::from_json_object(row_json, &headers)
//! }
//!
//! assert!(JobStatus::CompletedWithIssues.is_terminal());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PimError, Result};
