//! Scoring configuration.
//!
//! Weights, caps and rule thresholds are plain data, loaded once from the
//! `scoring` section of the service configuration. Any field left out keeps
//! its default.

use serde::{Deserialize, Serialize};
use squeeze_common::{Config, Validate, ValidationError, ValidationResult};

// ============================================================================
// Component Weights
// ============================================================================

/// Weight and cap of one score component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeight {
    /// Multiplier applied to the raw metric
    pub weight: f64,
    /// Maximum points this component can contribute
    pub cap: f64,
}

impl ComponentWeight {
    pub const fn new(weight: f64, cap: f64) -> Self {
        Self { weight, cap }
    }

    /// Points for a metric value. Absent or negative values earn nothing.
    pub fn points(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) if v > 0.0 => (v * self.weight).min(self.cap),
            _ => 0.0,
        }
    }
}

/// Weight table of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_short_interest_weight")]
    pub short_interest: ComponentWeight,

    #[serde(default = "default_utilization_weight")]
    pub utilization: ComponentWeight,

    #[serde(default = "default_cost_to_borrow_weight")]
    pub cost_to_borrow: ComponentWeight,

    #[serde(default = "default_days_to_cover_weight")]
    pub days_to_cover: ComponentWeight,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            short_interest: default_short_interest_weight(),
            utilization: default_utilization_weight(),
            cost_to_borrow: default_cost_to_borrow_weight(),
            days_to_cover: default_days_to_cover_weight(),
        }
    }
}

fn default_short_interest_weight() -> ComponentWeight {
    ComponentWeight::new(0.8, 30.0)
}

fn default_utilization_weight() -> ComponentWeight {
    ComponentWeight::new(0.25, 25.0)
}

fn default_cost_to_borrow_weight() -> ComponentWeight {
    ComponentWeight::new(0.5, 25.0)
}

fn default_days_to_cover_weight() -> ComponentWeight {
    ComponentWeight::new(4.0, 20.0)
}

// ============================================================================
// Classifier Thresholds
// ============================================================================

/// Thresholds of the squeeze classification rules. All comparisons are
/// strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    // === Gamma / short combo ===
    pub gamma_min_short_interest: f64,
    pub gamma_min_utilization: f64,
    pub gamma_min_cost_to_borrow: f64,
    /// Score above which a combo is imminent
    pub gamma_imminent_score: f64,

    // === Classic short squeeze ===
    pub classic_min_short_interest: f64,
    pub classic_min_utilization: f64,
    pub classic_min_days_to_cover: f64,
    pub classic_imminent_score: f64,

    // === Borrowing crisis ===
    pub crisis_min_cost_to_borrow: f64,
    pub crisis_imminent_cost_to_borrow: f64,

    // === Potential setup ===
    pub potential_min_score: f64,
    pub potential_building_score: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            gamma_min_short_interest: 20.0,
            gamma_min_utilization: 90.0,
            gamma_min_cost_to_borrow: 30.0,
            gamma_imminent_score: 85.0,
            classic_min_short_interest: 15.0,
            classic_min_utilization: 85.0,
            classic_min_days_to_cover: 3.0,
            classic_imminent_score: 80.0,
            crisis_min_cost_to_borrow: 50.0,
            crisis_imminent_cost_to_borrow: 100.0,
            potential_min_score: 60.0,
            potential_building_score: 75.0,
        }
    }
}

// ============================================================================
// Alert Thresholds
// ============================================================================

/// Thresholds of the alert rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Cost-to-borrow above which a CTB explosion is raised
    pub ctb_explosion: f64,
    /// Score at or above which a legendary setup is raised
    pub legendary_score: u8,
    /// Utilization above which extreme utilization is raised
    pub extreme_utilization: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            ctb_explosion: 80.0,
            legendary_score: 90,
            extreme_utilization: 95.0,
        }
    }
}

// ============================================================================
// Scoring Configuration
// ============================================================================

/// Everything the scoring pipeline needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,

    #[serde(default)]
    pub classifier: ClassifierThresholds,

    #[serde(default)]
    pub alerts: AlertThresholds,
}

impl ScoringConfig {
    /// Read the `scoring` section of the service config.
    pub fn from_config(config: &Config) -> ValidationResult<Self> {
        let scoring = match &config.scoring {
            Some(value) => serde_json::from_value::<Self>(value.clone())
                .map_err(|e| ValidationError::invalid("scoring", e.to_string()))?,
            None => Self::default(),
        };

        scoring.validate()?;
        Ok(scoring)
    }
}

fn check_non_negative(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ValidationError::invalid(field, "must be a non-negative number"));
    }
}

impl Validate for ScoringConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        let w = &self.weights;
        for (name, component) in [
            ("short_interest", w.short_interest),
            ("utilization", w.utilization),
            ("cost_to_borrow", w.cost_to_borrow),
            ("days_to_cover", w.days_to_cover),
        ] {
            check_non_negative(&mut errors, &format!("scoring.weights.{name}.weight"), component.weight);
            check_non_negative(&mut errors, &format!("scoring.weights.{name}.cap"), component.cap);
        }

        let c = &self.classifier;
        for (name, value) in [
            ("gamma_min_short_interest", c.gamma_min_short_interest),
            ("gamma_min_utilization", c.gamma_min_utilization),
            ("gamma_min_cost_to_borrow", c.gamma_min_cost_to_borrow),
            ("gamma_imminent_score", c.gamma_imminent_score),
            ("classic_min_short_interest", c.classic_min_short_interest),
            ("classic_min_utilization", c.classic_min_utilization),
            ("classic_min_days_to_cover", c.classic_min_days_to_cover),
            ("classic_imminent_score", c.classic_imminent_score),
            ("crisis_min_cost_to_borrow", c.crisis_min_cost_to_borrow),
            ("crisis_imminent_cost_to_borrow", c.crisis_imminent_cost_to_borrow),
            ("potential_min_score", c.potential_min_score),
            ("potential_building_score", c.potential_building_score),
        ] {
            check_non_negative(&mut errors, &format!("scoring.classifier.{name}"), value);
        }

        check_non_negative(&mut errors, "scoring.alerts.ctb_explosion", self.alerts.ctb_explosion);
        check_non_negative(
            &mut errors,
            "scoring.alerts.extreme_utilization",
            self.alerts.extreme_utilization,
        );
        if self.alerts.legendary_score > 100 {
            errors.push(ValidationError::invalid(
                "scoring.alerts.legendary_score",
                "must be between 0 and 100",
            ));
        }

        ValidationError::collect(errors)
    }
}
