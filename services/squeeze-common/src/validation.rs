//! Configuration and request validation.
//!
//! Validation runs before any scan work starts, so an invalid batch size or
//! filter value never reaches the metrics provider.

use thiserror::Error;

use crate::config::{Config, NetworkConfig, ObservabilityConfig, ProviderConfig, ProviderKind, ScannerConfig};

/// Validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Shorthand for an [`ValidationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors into a single result.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections and requests.
pub trait Validate {
    /// Validate this value.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let errors: Vec<ValidationError> = [
            self.network.validate(),
            self.observability.validate(),
            self.scanner.validate(),
            self.provider.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        ValidationError::collect(errors)
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::invalid("network.port", "must be between 1 and 65535"));
        }
        if self.bind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "network.bind".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_level",
                format!("'{}' is not one of {:?}", self.log_level, LEVELS),
            ));
        }
        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(ValidationError::invalid(
                "observability.log_format",
                "must be 'json' or 'pretty'",
            ));
        }
        Ok(())
    }
}

impl Validate for ScannerConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.batch_size == 0 {
            errors.push(ValidationError::invalid("scanner.batch_size", "must be at least 1"));
        }
        if self.max_continuous_cycles == 0 {
            errors.push(ValidationError::invalid(
                "scanner.max_continuous_cycles",
                "must be at least 1",
            ));
        }
        if self.event_buffer == 0 {
            errors.push(ValidationError::invalid("scanner.event_buffer", "must be at least 1"));
        }

        ValidationError::collect(errors)
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.kind == ProviderKind::Ortex && self.ortex_base_url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "provider.ortex_base_url".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::invalid(
                "provider.request_timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
