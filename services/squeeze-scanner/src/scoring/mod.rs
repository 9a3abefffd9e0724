//! Squeeze scoring.
//!
//! # Architecture
//!
//! ```text
//! MetricsSnapshot ──▶ ScoringEngine ──▶ score (0-100)
//!        │                                   │
//!        └──────────────┬────────────────────┘
//!                       ▼
//!            ┌──────────┴──────────┐
//!            ▼                     ▼
//!       Classifier           AlertGenerator
//!  (first match wins)     (independent rules)
//! ```
//!
//! All three stages are pure functions of the snapshot and the thresholds
//! loaded at startup.

pub mod alerts;
pub mod classifier;
pub mod config;
pub mod engine;

pub use alerts::{Alert, AlertGenerator, AlertKind, AlertLevel};
pub use classifier::{Classification, Classifier, SqueezeTiming, SqueezeType};
pub use config::{AlertThresholds, ClassifierThresholds, ComponentWeight, ScoringConfig, ScoringWeights};
pub use engine::{ScoreBreakdown, ScoringEngine};

use crate::data::MetricsSnapshot;

/// Score, classification and alerts of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: u8,
    pub classification: Classification,
    pub alerts: Vec<Alert>,
}

/// The three scoring stages wired together.
#[derive(Debug, Default)]
pub struct ScoringPipeline {
    engine: ScoringEngine,
    classifier: Classifier,
    alerts: AlertGenerator,
}

impl ScoringPipeline {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            engine: ScoringEngine::new(config.weights),
            classifier: Classifier::new(config.classifier),
            alerts: AlertGenerator::new(config.alerts),
        }
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Evaluation {
        let score = self.engine.score(snapshot);
        Evaluation {
            score,
            classification: self.classifier.classify(score, snapshot),
            alerts: self.alerts.generate(score, snapshot),
        }
    }
}
