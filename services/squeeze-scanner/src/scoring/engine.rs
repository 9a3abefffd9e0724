//! Composite squeeze score ("Holy Grail" score).
//!
//! Four independently capped components are summed, rounded half away from
//! zero and clamped to 0-100. The engine is pure: the same snapshot always
//! yields the same score.

use serde::{Deserialize, Serialize};

use super::config::ScoringWeights;
use crate::data::MetricsSnapshot;

/// Maximum composite score
pub const MAX_SCORE: u8 = 100;

/// Per-component contribution to a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub short_interest: f64,
    pub utilization: f64,
    pub cost_to_borrow: f64,
    pub days_to_cover: f64,
}

impl ScoreBreakdown {
    /// Unrounded sum of the components.
    pub fn raw_total(&self) -> f64 {
        self.short_interest + self.utilization + self.cost_to_borrow + self.days_to_cover
    }

    /// Final score.
    pub fn total(&self) -> u8 {
        let rounded = self.raw_total().round();
        if rounded.is_nan() || rounded <= 0.0 {
            0
        } else if rounded >= f64::from(MAX_SCORE) {
            MAX_SCORE
        } else {
            rounded as u8
        }
    }
}

/// Scoring engine.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Component contributions for a snapshot.
    pub fn breakdown(&self, snapshot: &MetricsSnapshot) -> ScoreBreakdown {
        ScoreBreakdown {
            short_interest: self.weights.short_interest.points(snapshot.short_interest_pct),
            utilization: self.weights.utilization.points(snapshot.utilization_pct),
            cost_to_borrow: self.weights.cost_to_borrow.points(snapshot.cost_to_borrow_pct),
            days_to_cover: self.weights.days_to_cover.points(snapshot.days_to_cover),
        }
    }

    /// Composite score for a snapshot.
    pub fn score(&self, snapshot: &MetricsSnapshot) -> u8 {
        self.breakdown(snapshot).total()
    }
}
