//! Scan requests and result filters.

use serde::{Deserialize, Serialize};
use squeeze_common::{Validate, ValidationError, ValidationResult};
use std::fmt;

use super::result::ScanResult;

// ============================================================================
// Scan Mode
// ============================================================================

/// One cycle, or cycles until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    OneShot,
    Continuous,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneShot => write!(f, "one_shot"),
            Self::Continuous => write!(f, "continuous"),
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Minimum thresholds a result must meet to be published.
///
/// Filters never affect what is fetched or scored, only which results reach
/// subscribers. Absent metrics compare as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFilters {
    #[serde(default, alias = "minHolyGrail")]
    pub min_score: Option<f64>,

    #[serde(default)]
    pub min_short_interest: Option<f64>,

    #[serde(default)]
    pub min_utilization: Option<f64>,
}

impl ScanFilters {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none() && self.min_short_interest.is_none() && self.min_utilization.is_none()
    }

    /// Whether a result passes every configured threshold.
    pub fn accepts(&self, result: &ScanResult) -> bool {
        let metrics = result.metrics();
        let short_interest = metrics.and_then(|m| m.short_interest_pct).unwrap_or(0.0);
        let utilization = metrics.and_then(|m| m.utilization_pct).unwrap_or(0.0);

        self.min_score.map_or(true, |min| f64::from(result.score) >= min)
            && self.min_short_interest.map_or(true, |min| short_interest >= min)
            && self.min_utilization.map_or(true, |min| utilization >= min)
    }

    /// Keep only accepted results, preserving order.
    pub fn apply(&self, results: Vec<ScanResult>) -> Vec<ScanResult> {
        if self.is_empty() {
            return results;
        }
        results.into_iter().filter(|r| self.accepts(r)).collect()
    }
}

fn check_threshold(errors: &mut Vec<ValidationError>, field: &str, value: Option<f64>, max: Option<f64>) {
    let Some(v) = value else { return };

    if v.is_nan() || v < 0.0 {
        errors.push(ValidationError::invalid(field, "must be a non-negative number"));
    } else if let Some(max) = max {
        if v > max {
            errors.push(ValidationError::invalid(field, format!("must not exceed {max}")));
        }
    }
}

impl Validate for ScanFilters {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        check_threshold(&mut errors, "filters.minScore", self.min_score, Some(100.0));
        check_threshold(&mut errors, "filters.minShortInterest", self.min_short_interest, None);
        check_threshold(&mut errors, "filters.minUtilization", self.min_utilization, Some(100.0));
        ValidationError::collect(errors)
    }
}

// ============================================================================
// Scan Request
// ============================================================================

/// What a subscriber asks to scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Explicit symbols; empty means "use a built-in universe"
    #[serde(default)]
    pub symbols: Vec<String>,

    #[serde(default)]
    pub filters: ScanFilters,

    /// Draw from the expanded universe
    #[serde(default, alias = "useExpandedData")]
    pub use_expanded_universe: bool,

    /// Keep scanning until stopped
    #[serde(default, alias = "autoRefresh")]
    pub continuous: bool,
}

impl ScanRequest {
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ScanMode {
        if self.continuous {
            ScanMode::Continuous
        } else {
            ScanMode::OneShot
        }
    }
}
