//! Synthetic metrics for demos and offline development.
//!
//! Values come from a small linear congruential generator seeded with the
//! sum of the symbol's character codes plus the current one-minute bucket,
//! so a symbol reads the same for a minute and then drifts.

use async_trait::async_trait;
use chrono::Utc;

use super::provider::{MetricsProvider, ProviderError};
use super::MetricsSnapshot;

const LCG_MULTIPLIER: u64 = 9_301;
const LCG_INCREMENT: u64 = 49_297;
const LCG_MODULUS: u64 = 233_280;

/// Length of one seed bucket, in milliseconds
const BUCKET_MILLIS: i64 = 60_000;

/// Pseudo-random sequence for one symbol.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed % LCG_MODULUS,
        }
    }

    /// Next value in `[min, max)`.
    fn range(&mut self, min: f64, max: f64) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        min + (self.state as f64 / LCG_MODULUS as f64) * (max - min)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Deterministic synthetic provider.
#[derive(Debug, Clone, Default)]
pub struct DemoProvider {
    /// Pinned time bucket; `None` follows the wall clock
    fixed_bucket: Option<u64>,
}

impl DemoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider frozen on one time bucket. Same symbol, same metrics.
    pub fn with_fixed_bucket(bucket: u64) -> Self {
        Self {
            fixed_bucket: Some(bucket),
        }
    }

    fn bucket(&self) -> u64 {
        self.fixed_bucket
            .unwrap_or_else(|| (Utc::now().timestamp_millis() / BUCKET_MILLIS).max(0) as u64)
    }

    /// Generate the snapshot for a symbol in a given bucket.
    fn generate(symbol: &str, bucket: u64) -> MetricsSnapshot {
        let char_sum: u64 = symbol.chars().map(u64::from).sum();
        let mut rng = Lcg::new(char_sum + bucket);

        let short_interest = round_to(rng.range(3.0, 45.0), 2);
        let utilization = round_to(rng.range(45.0, 98.0).min(99.9), 1);
        let cost_to_borrow = round_to(rng.range(2.0, short_interest * 4.0).min(500.0), 2);
        let days_to_cover = round_to(rng.range(0.3, short_interest / 2.5).min(20.0), 2);

        MetricsSnapshot::new(symbol, short_interest, utilization, cost_to_borrow, days_to_cover)
    }
}

#[async_trait]
impl MetricsProvider for DemoProvider {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn fetch_metrics(&self, symbol: &str) -> Result<MetricsSnapshot, ProviderError> {
        if symbol.trim().is_empty() {
            return Err(ProviderError::DataNotAvailable("empty symbol".into()));
        }
        Ok(Self::generate(symbol, self.bucket()))
    }
}
