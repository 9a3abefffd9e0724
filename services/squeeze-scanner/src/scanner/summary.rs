//! Cycle rollups.

use serde::{Deserialize, Serialize};

use super::result::ScanResult;
use crate::data::BorrowTrend;
use crate::scoring::{AlertKind, SqueezeTiming, SqueezeType};

/// How many entries `top_squeezes` keeps
pub const TOP_SQUEEZES: usize = 10;

/// A leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSqueeze {
    pub symbol: String,
    pub score: u8,
    pub squeeze_type: SqueezeType,
}

/// Rollup of one cycle's results.
///
/// The score bands partition the results: `legendary + strong + moderate +
/// weak + below_threshold == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    /// Score >= 90
    pub legendary: usize,
    /// 85-89
    pub strong: usize,
    /// 75-84
    pub moderate: usize,
    /// 60-74
    pub weak: usize,
    /// Below 60, error results included
    pub below_threshold: usize,
    pub alert_count: usize,
    pub ctb_explosions: usize,
    pub imminent_squeezes: usize,
    pub errors: usize,
    pub top_squeezes: Vec<TopSqueeze>,
}

fn is_ctb_explosion(result: &ScanResult) -> bool {
    let trend_exploding = result
        .metrics()
        .and_then(|m| m.borrow_trend())
        .is_some_and(|t| t == BorrowTrend::Exploding);

    trend_exploding || result.alerts.iter().any(|a| a.kind == AlertKind::CtbExplosion)
}

/// Recompute the rollup from scratch.
pub fn summarize(results: &[ScanResult]) -> Summary {
    let mut summary = Summary {
        total: results.len(),
        ..Summary::default()
    };

    for result in results {
        match result.score {
            90..=u8::MAX => summary.legendary += 1,
            85..=89 => summary.strong += 1,
            75..=84 => summary.moderate += 1,
            60..=74 => summary.weak += 1,
            _ => summary.below_threshold += 1,
        }

        summary.alert_count += result.alerts.len();

        if is_ctb_explosion(result) {
            summary.ctb_explosions += 1;
        }
        if result.classification.timing == SqueezeTiming::Imminent {
            summary.imminent_squeezes += 1;
        }
        if result.is_error() {
            summary.errors += 1;
        }
    }

    let mut ranked: Vec<&ScanResult> = results.iter().filter(|r| !r.is_error()).collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    summary.top_squeezes = ranked
        .into_iter()
        .take(TOP_SQUEEZES)
        .map(|r| TopSqueeze {
            symbol: r.symbol.clone(),
            score: r.score,
            squeeze_type: r.classification.squeeze_type,
        })
        .collect();

    summary
}
