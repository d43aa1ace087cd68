//! Error types for PIM

use thiserror::Error;

/// Result type alias for PIM operations
pub type Result<T> = std::result::Result<T, PimError>;

/// Main error type for shared PIM types
#[derive(Error, Debug)]
pub enum PimError {
    #[error("Unknown job status: {0}")]
    InvalidStatus(String),

    #[error("Attribute '{0}' is not one of the accepted headers")]
    UnknownAttribute(String),

    #[error("Invalid value for attribute '{attribute}': {reason}")]
    InvalidAttributeValue { attribute: String, reason: String },
}

impl PimError {
    /// Create an invalid attribute value error
    pub fn invalid_value(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttributeValue {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}
