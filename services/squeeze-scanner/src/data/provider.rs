//! Metrics provider abstraction.
//!
//! The scanner never talks to a data vendor directly; it asks a
//! [`MetricsProvider`] for one symbol at a time. A failure for one symbol is
//! reported as a [`ProviderError`] and absorbed by the scan, so providers
//! should not retry internally.

use async_trait::async_trait;
use thiserror::Error;

use super::MetricsSnapshot;

// ============================================================================
// Provider Error
// ============================================================================

/// Errors a metrics provider can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Missing or rejected credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Upstream rate limit hit
    #[error("Rate limited{}", retry_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// No data for the requested symbol
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Anything else (bad payload, unexpected status)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn retry_suffix(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs} seconds"))
        .unwrap_or_default()
}

impl ProviderError {
    /// Check if the error is worth retrying on a later cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }
}

// ============================================================================
// Metrics Provider Trait
// ============================================================================

/// Source of per-symbol metrics.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Provider name, reported to subscribers as the scan endpoint.
    fn name(&self) -> &'static str;

    /// Check that the provider can serve requests at all.
    ///
    /// Called once at the start of every cycle. An error here is
    /// unrecoverable for the session (e.g. missing credentials).
    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Fetch the current metrics for one symbol.
    async fn fetch_metrics(&self, symbol: &str) -> Result<MetricsSnapshot, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProviderError::RateLimited { retry_after_secs: Some(2) }.to_string(),
            "Rate limited, retry after 2 seconds"
        );
        assert_eq!(
            ProviderError::RateLimited { retry_after_secs: None }.to_string(),
            "Rate limited"
        );
        assert_eq!(
            ProviderError::Auth("ORTEX_API_KEY not configured".into()).to_string(),
            "Authentication error: ORTEX_API_KEY not configured"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited { retry_after_secs: None }.is_recoverable());
        assert!(!ProviderError::Auth("bad key".into()).is_recoverable());
        assert!(!ProviderError::DataNotAvailable("XYZ".into()).is_recoverable());
    }
}
