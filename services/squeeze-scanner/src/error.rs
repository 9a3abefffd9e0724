//! Scan-level errors.
//!
//! Per-symbol fetch failures never show up here: they become error results
//! inside a cycle. A [`ScanError`] means the scan as a whole could not start
//! or had to stop.

use squeeze_common::ValidationError;
use thiserror::Error;

use crate::data::ProviderError;

/// Error that rejects or aborts a scan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    /// Invalid filter values or scanner settings, caught before any fetch
    #[error("Invalid scan configuration: {0}")]
    Configuration(#[from] ValidationError),

    /// The request itself is unusable (e.g. a blank symbol)
    #[error("Malformed scan request: {0}")]
    MalformedRequest(String),

    /// Unrecoverable failure of a running session
    #[error("Scan session failed: {0}")]
    Session(String),
}

impl ScanError {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::MalformedRequest(_) => 400,
            Self::Session(_) => 502,
        }
    }
}

impl From<ProviderError> for ScanError {
    fn from(e: ProviderError) -> Self {
        Self::Session(e.to_string())
    }
}

impl From<ScanError> for squeeze_common::Error {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Configuration(v) => Self::Validation(v),
            ScanError::MalformedRequest(msg) => Self::InvalidInput(msg),
            ScanError::Session(msg) => Self::External(msg),
        }
    }
}
