//! Per-symbol scan results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{FetchFailure, FetchOutcome, MetricsSnapshot};
use crate::scoring::{Alert, Classification, ScoringPipeline};

/// What the scan learned about a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Metrics(MetricsSnapshot),
    Error { reason: String },
}

/// One symbol's result for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub outcome: ScanOutcome,
    /// Composite score, 0-100
    pub score: u8,
    pub classification: Classification,
    pub alerts: Vec<Alert>,
    pub generated_at: DateTime<Utc>,
}

impl ScanResult {
    /// Score, classify and alert on a fetched snapshot.
    pub fn from_snapshot(snapshot: MetricsSnapshot, pipeline: &ScoringPipeline) -> Self {
        let evaluation = pipeline.evaluate(&snapshot);
        Self {
            symbol: snapshot.symbol.clone(),
            outcome: ScanOutcome::Metrics(snapshot),
            score: evaluation.score,
            classification: evaluation.classification,
            alerts: evaluation.alerts,
            generated_at: Utc::now(),
        }
    }

    /// Result of a failed fetch: score 0, ERROR / N/A, one API error alert.
    pub fn error(failure: FetchFailure) -> Self {
        Self {
            alerts: vec![Alert::api_error(&failure.reason)],
            symbol: failure.symbol,
            outcome: ScanOutcome::Error {
                reason: failure.reason,
            },
            score: 0,
            classification: Classification::error(),
            generated_at: Utc::now(),
        }
    }

    pub fn from_outcome(outcome: FetchOutcome, pipeline: &ScoringPipeline) -> Self {
        match outcome {
            Ok(snapshot) => Self::from_snapshot(snapshot, pipeline),
            Err(failure) => Self::error(failure),
        }
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        match &self.outcome {
            ScanOutcome::Metrics(m) => Some(m),
            ScanOutcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Error { .. })
    }
}

/// Order results by descending score. The sort is stable, so equal scores
/// keep batch-plan order.
pub fn rank(results: &mut [ScanResult]) {
    results.sort_by(|a, b| b.score.cmp(&a.score));
}
