//! Error types for the squeeze scanner services.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the scanner services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration or request failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream metrics service error
    #[error("External service error: {0}")]
    External(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::External(_) => 502,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("bad".into()).status_code(), 400);
        assert_eq!(Error::NotFound("scan".into()).status_code(), 404);
        assert_eq!(Error::External("ortex".into()).status_code(), 502);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
        assert_eq!(Error::Config("missing".into()).status_code(), 500);
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err: Error = ValidationError::MissingField {
            field: "provider.ortex_api_key".into(),
        }
        .into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Missing required field: provider.ortex_api_key");
    }
}
