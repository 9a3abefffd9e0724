//! Market microstructure data.
//!
//! A [`MetricsSnapshot`] is the unit the scanner operates on: one symbol's
//! short interest, lending utilization, cost-to-borrow and days-to-cover for
//! one scan cycle. Every metric is optional; an absent metric means the
//! provider had no value, which is not the same as a zero reading.

pub mod demo;
pub mod ortex;
pub mod provider;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use demo::DemoProvider;
pub use ortex::OrtexProvider;
pub use provider::{MetricsProvider, ProviderError};

// ============================================================================
// Borrow Trend
// ============================================================================

/// Direction of the cost-to-borrow rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowTrend {
    Stable,
    Rising,
    RisingFast,
    Exploding,
}

impl BorrowTrend {
    /// Infer a trend from the current cost-to-borrow rate alone.
    ///
    /// Used when the provider does not report a trend of its own.
    pub fn from_cost_to_borrow(cost_to_borrow_pct: f64) -> Self {
        if cost_to_borrow_pct > 80.0 {
            Self::Exploding
        } else if cost_to_borrow_pct > 40.0 {
            Self::RisingFast
        } else if cost_to_borrow_pct > 20.0 {
            Self::Rising
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for BorrowTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "STABLE"),
            Self::Rising => write!(f, "RISING"),
            Self::RisingFast => write!(f, "RISING_FAST"),
            Self::Exploding => write!(f, "EXPLODING"),
        }
    }
}

impl FromStr for BorrowTrend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "STABLE" => Ok(Self::Stable),
            "RISING" => Ok(Self::Rising),
            "RISING_FAST" => Ok(Self::RisingFast),
            "EXPLODING" => Ok(Self::Exploding),
            other => Err(format!("unknown borrow trend '{other}'")),
        }
    }
}

// ============================================================================
// Metrics Snapshot
// ============================================================================

/// Per-symbol metrics for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Ticker symbol (e.g., "GME")
    pub symbol: String,
    /// Percentage of the float sold short
    pub short_interest_pct: Option<f64>,
    /// Percentage of lendable shares on loan, 0-100
    pub utilization_pct: Option<f64>,
    /// Annualized borrow fee (%)
    pub cost_to_borrow_pct: Option<f64>,
    /// Short interest divided by average daily volume
    pub days_to_cover: Option<f64>,
    /// Trend as reported by the provider, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_to_borrow_trend: Option<BorrowTrend>,
}

impl MetricsSnapshot {
    /// A snapshot with every metric absent.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            short_interest_pct: None,
            utilization_pct: None,
            cost_to_borrow_pct: None,
            days_to_cover: None,
            cost_to_borrow_trend: None,
        }
    }

    /// A snapshot with all four metrics present.
    pub fn new(
        symbol: impl Into<String>,
        short_interest_pct: f64,
        utilization_pct: f64,
        cost_to_borrow_pct: f64,
        days_to_cover: f64,
    ) -> Self {
        Self {
            short_interest_pct: Some(short_interest_pct),
            utilization_pct: Some(utilization_pct),
            cost_to_borrow_pct: Some(cost_to_borrow_pct),
            days_to_cover: Some(days_to_cover),
            ..Self::empty(symbol)
        }
    }

    pub fn with_short_interest(mut self, pct: f64) -> Self {
        self.short_interest_pct = Some(pct);
        self
    }

    pub fn with_utilization(mut self, pct: f64) -> Self {
        self.utilization_pct = Some(pct);
        self
    }

    pub fn with_cost_to_borrow(mut self, pct: f64) -> Self {
        self.cost_to_borrow_pct = Some(pct);
        self
    }

    pub fn with_days_to_cover(mut self, days: f64) -> Self {
        self.days_to_cover = Some(days);
        self
    }

    pub fn with_trend(mut self, trend: BorrowTrend) -> Self {
        self.cost_to_borrow_trend = Some(trend);
        self
    }

    /// Whether no metric is present at all.
    pub fn is_empty(&self) -> bool {
        self.short_interest_pct.is_none()
            && self.utilization_pct.is_none()
            && self.cost_to_borrow_pct.is_none()
            && self.days_to_cover.is_none()
    }

    /// Effective borrow trend: the provider's value, else one inferred from
    /// the cost-to-borrow rate. `None` when neither is known.
    pub fn borrow_trend(&self) -> Option<BorrowTrend> {
        self.cost_to_borrow_trend
            .or_else(|| self.cost_to_borrow_pct.map(BorrowTrend::from_cost_to_borrow))
    }
}

// ============================================================================
// Fetch Failure
// ============================================================================

/// A symbol whose metrics could not be fetched this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of fetching one symbol.
pub type FetchOutcome = Result<MetricsSnapshot, FetchFailure>;
