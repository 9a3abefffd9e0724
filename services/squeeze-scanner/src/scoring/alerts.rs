//! Threshold alerts.
//!
//! Every rule is evaluated on its own; a snapshot can raise any subset of
//! the alerts, always in table order. Alerts are rebuilt from scratch each
//! cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::classifier::RuleInput;
use super::config::AlertThresholds;
use crate::data::MetricsSnapshot;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    High,
    Critical,
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    CtbExplosion,
    LegendarySetup,
    ExtremeUtilization,
    ApiError,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CtbExplosion => "CTB_EXPLOSION",
            Self::LegendarySetup => "LEGENDARY_SETUP",
            Self::ExtremeUtilization => "EXTREME_UTILIZATION",
            Self::ApiError => "API_ERROR",
        };
        f.write_str(s)
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
        }
    }

    /// The single alert attached to a failed fetch.
    pub fn api_error(reason: &str) -> Self {
        Self::new(AlertLevel::High, AlertKind::ApiError, format!("API error: {reason}"))
    }
}

// ============================================================================
// Alert Rules
// ============================================================================

type Trigger = Box<dyn Fn(&RuleInput) -> bool + Send + Sync>;
type Message = Box<dyn Fn(&RuleInput) -> String + Send + Sync>;

/// One alert rule.
pub struct AlertRule {
    pub level: AlertLevel,
    pub kind: AlertKind,
    trigger: Trigger,
    message: Message,
}

impl AlertRule {
    pub fn new(
        level: AlertLevel,
        kind: AlertKind,
        trigger: impl Fn(&RuleInput) -> bool + Send + Sync + 'static,
        message: impl Fn(&RuleInput) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            level,
            kind,
            trigger: Box::new(trigger),
            message: Box::new(message),
        }
    }

    pub fn evaluate(&self, input: &RuleInput) -> Option<Alert> {
        (self.trigger)(input).then(|| Alert::new(self.level, self.kind, (self.message)(input)))
    }
}

impl fmt::Debug for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertRule")
            .field("level", &self.level)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The standard alert rules.
pub fn default_alert_rules(t: AlertThresholds) -> Vec<AlertRule> {
    let legendary = f64::from(t.legendary_score);

    vec![
        AlertRule::new(
            AlertLevel::Critical,
            AlertKind::CtbExplosion,
            move |i| i.cost_to_borrow > t.ctb_explosion,
            |i| format!("Cost to borrow exploding: {:.1}%", i.cost_to_borrow),
        ),
        AlertRule::new(
            AlertLevel::Critical,
            AlertKind::LegendarySetup,
            move |i| i.score >= legendary,
            |i| format!("Legendary Holy Grail score: {}", i.score),
        ),
        AlertRule::new(
            AlertLevel::High,
            AlertKind::ExtremeUtilization,
            move |i| i.utilization > t.extreme_utilization,
            |i| format!("Extreme utilization: {:.1}%", i.utilization),
        ),
    ]
}

/// Evaluates every alert rule against a scored snapshot.
#[derive(Debug)]
pub struct AlertGenerator {
    rules: Vec<AlertRule>,
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::new(AlertThresholds::default())
    }
}

impl AlertGenerator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            rules: default_alert_rules(thresholds),
        }
    }

    pub fn generate(&self, score: u8, snapshot: &MetricsSnapshot) -> Vec<Alert> {
        let input = RuleInput::new(score, snapshot);
        self.rules.iter().filter_map(|rule| rule.evaluate(&input)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_all_alerts_in_order() {
        let snapshot = MetricsSnapshot::new("GME", 30.0, 95.5, 85.0, 6.0);
        let alerts = AlertGenerator::default().generate(93, &snapshot);

        assert_eq!(
            kinds(&alerts),
            [AlertKind::CtbExplosion, AlertKind::LegendarySetup, AlertKind::ExtremeUtilization]
        );
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[0].message, "Cost to borrow exploding: 85.0%");
        assert_eq!(alerts[1].message, "Legendary Holy Grail score: 93");
        assert_eq!(alerts[2].level, AlertLevel::High);
        assert_eq!(alerts[2].message, "Extreme utilization: 95.5%");
    }

    #[test]
    fn test_alerts_independent() {
        let generator = AlertGenerator::default();

        let ctb_only = MetricsSnapshot::empty("A").with_cost_to_borrow(80.1);
        assert_eq!(kinds(&generator.generate(40, &ctb_only)), [AlertKind::CtbExplosion]);

        let util_only = MetricsSnapshot::empty("B").with_utilization(96.0);
        assert_eq!(kinds(&generator.generate(24, &util_only)), [AlertKind::ExtremeUtilization]);

        let score_only = MetricsSnapshot::empty("C");
        assert_eq!(kinds(&generator.generate(90, &score_only)), [AlertKind::LegendarySetup]);
    }

    #[test]
    fn test_thresholds() {
        let generator = AlertGenerator::default();
        let snapshot = MetricsSnapshot::new("EDGE", 10.0, 95.0, 80.0, 1.0);
        assert!(generator.generate(89, &snapshot).is_empty());
    }

    #[test]
    fn test_api_error_alert() {
        let alert = Alert::api_error("timeout");
        assert_eq!(alert.level, AlertLevel::High);
        assert_eq!(alert.kind, AlertKind::ApiError);
        assert_eq!(alert.message, "API error: timeout");

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "API_ERROR");
        assert_eq!(json["level"], "HIGH");
    }
}
