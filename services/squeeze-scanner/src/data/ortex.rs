//! Ortex REST adapter for short-side market data.
//!
//! Each metric lives behind its own endpoint:
//!
//! | metric | endpoint | field |
//! |--------|----------|-------|
//! | short interest | `/v1/short-interest/{symbol}` | `estimated_si` |
//! | utilization | `/v1/availability/{symbol}` | `utilization` |
//! | cost to borrow | `/v1/cost-to-borrow/{symbol}` | `current`, `trend` |
//! | days to cover | `/v1/days-to-cover/{symbol}` | `ortex` |
//!
//! The four requests for a symbol are issued concurrently. An endpoint
//! that fails or returns nothing leaves its metric absent; the symbol only
//! fails as a whole when none of the four endpoints answered.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use squeeze_common::Config;

use super::provider::{MetricsProvider, ProviderError};
use super::MetricsSnapshot;

// ============================================================================
// Constants
// ============================================================================

const SHORT_INTEREST_ENDPOINT: &str = "/v1/short-interest";
const AVAILABILITY_ENDPOINT: &str = "/v1/availability";
const COST_TO_BORROW_ENDPOINT: &str = "/v1/cost-to-borrow";
const DAYS_TO_COVER_ENDPOINT: &str = "/v1/days-to-cover";

/// Retry hint returned with a 429
const RATE_LIMIT_RETRY_SECS: u64 = 2;

// ============================================================================
// Response Bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct ShortInterestBody {
    estimated_si: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityBody {
    utilization: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CostToBorrowBody {
    current: Option<f64>,
    trend: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DaysToCoverBody {
    ortex: Option<f64>,
}

// ============================================================================
// Ortex Provider
// ============================================================================

/// Live metrics from the Ortex API.
pub struct OrtexProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OrtexProvider {
    /// Create a provider. A missing key is accepted here and reported by
    /// [`MetricsProvider::ensure_ready`] when a scan starts.
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ortex_api_key().map(str::to_string),
            config.provider.ortex_base_url.clone(),
            Duration::from_secs(config.provider.request_timeout_secs),
        )
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth("ORTEX_API_KEY not configured".into()))
    }

    /// `{base}{endpoint}/{symbol}` with the symbol encoded as a single path
    /// segment.
    fn endpoint_url(&self, endpoint: &str, symbol: &str) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|e| ProviderError::Internal(format!("Invalid Ortex URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::Internal(format!("Ortex URL cannot take a path: {}", self.base_url)))?
            .push(symbol);
        Ok(url)
    }

    /// GET one endpoint for one symbol. `Ok(None)` means the endpoint has
    /// no data for the symbol.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        symbol: &str,
    ) -> Result<Option<T>, ProviderError> {
        let url = self.endpoint_url(endpoint, symbol)?;
        debug!(url = %url, symbol, "Fetching from Ortex");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_key()?)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("Ortex rejected API key (HTTP {status})")));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: Some(RATE_LIMIT_RETRY_SECS),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Internal(format!("HTTP {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {e}")))
    }
}

/// Keep the value of one endpoint; remember the first error in case every
/// endpoint fails.
fn settle<T>(result: Result<Option<T>, ProviderError>, first_error: &mut Option<ProviderError>) -> Option<T> {
    match result {
        Ok(body) => body,
        Err(e) => {
            first_error.get_or_insert(e);
            None
        }
    }
}

#[async_trait]
impl MetricsProvider for OrtexProvider {
    fn name(&self) -> &'static str {
        "live-ortex"
    }

    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }

    async fn fetch_metrics(&self, symbol: &str) -> Result<MetricsSnapshot, ProviderError> {
        let (si, avail, ctb, dtc) = tokio::join!(
            self.get_json::<ShortInterestBody>(SHORT_INTEREST_ENDPOINT, symbol),
            self.get_json::<AvailabilityBody>(AVAILABILITY_ENDPOINT, symbol),
            self.get_json::<CostToBorrowBody>(COST_TO_BORROW_ENDPOINT, symbol),
            self.get_json::<DaysToCoverBody>(DAYS_TO_COVER_ENDPOINT, symbol),
        );

        let all_failed = si.is_err() && avail.is_err() && ctb.is_err() && dtc.is_err();
        let mut first_error = None;

        let si = settle(si, &mut first_error);
        let avail = settle(avail, &mut first_error);
        let ctb = settle(ctb, &mut first_error);
        let dtc = settle(dtc, &mut first_error);

        if all_failed {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let (cost_to_borrow_pct, trend) = ctb
            .map(|body| (body.current, body.trend))
            .unwrap_or((None, None));

        let snapshot = MetricsSnapshot {
            symbol: symbol.to_string(),
            short_interest_pct: si.and_then(|b| b.estimated_si),
            utilization_pct: avail.and_then(|b| b.utilization),
            cost_to_borrow_pct,
            days_to_cover: dtc.and_then(|b| b.ortex),
            cost_to_borrow_trend: trend.and_then(|t| t.parse().ok()),
        };

        if snapshot.is_empty() {
            debug!(symbol, "Ortex has no short data for symbol");
        } else {
            debug!(
                symbol,
                short_interest = ?snapshot.short_interest_pct,
                utilization = ?snapshot.utilization_pct,
                "Ortex metrics received"
            );
        }

        Ok(snapshot)
    }
}
