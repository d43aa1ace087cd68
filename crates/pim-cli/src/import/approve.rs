//! Approval of reviewed product rows

use crate::error::{ImportError, Result};
use crate::import::ports::ApprovalService;
use pim_common::types::{ObjectKey, ProductRow};
use tracing::{info, instrument};

/// Confirmation shown when the service sends no message of its own.
pub const DEFAULT_APPROVAL_MESSAGE: &str = "Products approved and saved!";

/// Outcome of a successful approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalConfirmation {
    pub message: String,
}

/// Commits reviewed rows through the persistence service
pub struct ApprovalSubmitter<'a, A: ?Sized> {
    service: &'a A,
}

impl<'a, A: ApprovalService + ?Sized> ApprovalSubmitter<'a, A> {
    pub fn new(service: &'a A) -> Self {
        Self { service }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn submit(&self, rows: &[ProductRow], object_key: &ObjectKey) -> Result<ApprovalConfirmation> {
        if rows.is_empty() {
            return Err(ImportError::NothingToApprove);
        }

        let message = self
            .service
            .approve_products(rows, object_key)
            .await?
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APPROVAL_MESSAGE.to_string());

        info!("Products approved");
        Ok(ApprovalConfirmation { message })
    }
}
