//! Squeeze classification.
//!
//! The classifier is an ordered rule table. Rules are tried top to bottom
//! and the first match decides the squeeze type and its timing; when none
//! matches the security is merely being monitored. Reordering the table
//! changes results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::ClassifierThresholds;
use crate::data::MetricsSnapshot;

// ============================================================================
// Classification
// ============================================================================

/// Kind of squeeze setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqueezeType {
    GammaShortCombo,
    ClassicShortSqueeze,
    BorrowingCrisis,
    PotentialSetup,
    Monitoring,
    /// Metrics could not be fetched
    Error,
}

impl fmt::Display for SqueezeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GammaShortCombo => "GAMMA_SHORT_COMBO",
            Self::ClassicShortSqueeze => "CLASSIC_SHORT_SQUEEZE",
            Self::BorrowingCrisis => "BORROWING_CRISIS",
            Self::PotentialSetup => "POTENTIAL_SETUP",
            Self::Monitoring => "MONITORING",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// How close a setup is to triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqueezeTiming {
    Early,
    Building,
    Imminent,
    Monitoring,
    /// Error results only
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for SqueezeTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Early => "EARLY",
            Self::Building => "BUILDING",
            Self::Imminent => "IMMINENT",
            Self::Monitoring => "MONITORING",
            Self::NotApplicable => "N/A",
        };
        f.write_str(s)
    }
}

/// Squeeze type plus timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub squeeze_type: SqueezeType,
    pub timing: SqueezeTiming,
}

impl Classification {
    pub const fn new(squeeze_type: SqueezeType, timing: SqueezeTiming) -> Self {
        Self { squeeze_type, timing }
    }

    /// Fallback when no rule matches.
    pub const fn monitoring() -> Self {
        Self::new(SqueezeType::Monitoring, SqueezeTiming::Early)
    }

    /// Classification of a failed fetch.
    pub const fn error() -> Self {
        Self::new(SqueezeType::Error, SqueezeTiming::NotApplicable)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Rule input. Absent metrics read as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleInput {
    pub score: f64,
    pub short_interest: f64,
    pub utilization: f64,
    pub cost_to_borrow: f64,
    pub days_to_cover: f64,
}

impl RuleInput {
    pub fn new(score: u8, snapshot: &MetricsSnapshot) -> Self {
        Self {
            score: f64::from(score),
            short_interest: snapshot.short_interest_pct.unwrap_or(0.0),
            utilization: snapshot.utilization_pct.unwrap_or(0.0),
            cost_to_borrow: snapshot.cost_to_borrow_pct.unwrap_or(0.0),
            days_to_cover: snapshot.days_to_cover.unwrap_or(0.0),
        }
    }
}

type Predicate = Box<dyn Fn(&RuleInput) -> bool + Send + Sync>;
type Outcome = Box<dyn Fn(&RuleInput) -> Classification + Send + Sync>;

/// One entry of the rule table.
pub struct ClassificationRule {
    pub name: &'static str,
    predicate: Predicate,
    outcome: Outcome,
}

impl ClassificationRule {
    pub fn new(
        name: &'static str,
        predicate: impl Fn(&RuleInput) -> bool + Send + Sync + 'static,
        outcome: impl Fn(&RuleInput) -> Classification + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            predicate: Box::new(predicate),
            outcome: Box::new(outcome),
        }
    }

    pub fn matches(&self, input: &RuleInput) -> bool {
        (self.predicate)(input)
    }

    pub fn classify(&self, input: &RuleInput) -> Classification {
        (self.outcome)(input)
    }
}

impl fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationRule").field("name", &self.name).finish()
    }
}

fn timing_if(condition: bool, then: SqueezeTiming, otherwise: SqueezeTiming) -> SqueezeTiming {
    if condition {
        then
    } else {
        otherwise
    }
}

/// The standard rule table, highest priority first.
pub fn default_rules(t: ClassifierThresholds) -> Vec<ClassificationRule> {
    use SqueezeTiming::{Building, Imminent, Monitoring};

    vec![
        ClassificationRule::new(
            "gamma_short_combo",
            move |i| {
                i.short_interest > t.gamma_min_short_interest
                    && i.utilization > t.gamma_min_utilization
                    && i.cost_to_borrow > t.gamma_min_cost_to_borrow
            },
            move |i| {
                Classification::new(
                    SqueezeType::GammaShortCombo,
                    timing_if(i.score > t.gamma_imminent_score, Imminent, Building),
                )
            },
        ),
        ClassificationRule::new(
            "classic_short_squeeze",
            move |i| {
                i.short_interest > t.classic_min_short_interest
                    && i.utilization > t.classic_min_utilization
                    && i.days_to_cover > t.classic_min_days_to_cover
            },
            move |i| {
                Classification::new(
                    SqueezeType::ClassicShortSqueeze,
                    timing_if(i.score > t.classic_imminent_score, Imminent, Building),
                )
            },
        ),
        ClassificationRule::new(
            "borrowing_crisis",
            move |i| i.cost_to_borrow > t.crisis_min_cost_to_borrow,
            move |i| {
                Classification::new(
                    SqueezeType::BorrowingCrisis,
                    timing_if(i.cost_to_borrow > t.crisis_imminent_cost_to_borrow, Imminent, Building),
                )
            },
        ),
        ClassificationRule::new(
            "potential_setup",
            move |i| i.score > t.potential_min_score,
            move |i| {
                Classification::new(
                    SqueezeType::PotentialSetup,
                    timing_if(i.score > t.potential_building_score, Building, Monitoring),
                )
            },
        ),
    ]
}

// ============================================================================
// Classifier
// ============================================================================

/// First-match-wins classifier.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::default())
    }
}

impl Classifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self::with_rules(default_rules(thresholds))
    }

    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Name of the rule that decides this input, if any.
    pub fn matching_rule(&self, score: u8, snapshot: &MetricsSnapshot) -> Option<&'static str> {
        let input = RuleInput::new(score, snapshot);
        self.rules.iter().find(|r| r.matches(&input)).map(|r| r.name)
    }

    pub fn classify(&self, score: u8, snapshot: &MetricsSnapshot) -> Classification {
        let input = RuleInput::new(score, snapshot);
        self.rules
            .iter()
            .find(|rule| rule.matches(&input))
            .map_or_else(Classification::monitoring, |rule| rule.classify(&input))
    }
}
