//! Batch planning and per-batch concurrent fetching.

use futures::future::join_all;
use squeeze_common::ValidationError;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::data::{FetchFailure, FetchOutcome, MetricsProvider};
use crate::error::ScanError;

/// Contiguous, order-preserving partition of the scan universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    batches: Vec<Vec<String>>,
    total: usize,
}

impl BatchPlan {
    /// Split `symbols` into `ceil(N / batch_size)` batches. Every batch is
    /// full except possibly the last.
    pub fn new(symbols: Vec<String>, batch_size: usize) -> Result<Self, ScanError> {
        if batch_size == 0 {
            return Err(ValidationError::invalid("scanner.batch_size", "must be at least 1").into());
        }

        let total = symbols.len();
        let batches = symbols.chunks(batch_size).map(<[String]>::to_vec).collect();

        Ok(Self { batches, total })
    }

    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of symbols across all batches.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All symbols in plan order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().flatten().map(String::as_str)
    }
}

/// Fetch every symbol of a batch concurrently and wait for all of them.
///
/// Outcomes come back in batch order. A failed or panicked fetch only
/// affects its own symbol.
pub async fn fetch_batch(provider: &Arc<dyn MetricsProvider>, batch: &[String]) -> Vec<FetchOutcome> {
    let handles = batch.iter().map(|symbol| {
        let provider = Arc::clone(provider);
        let symbol = symbol.clone();
        tokio::spawn(async move {
            match provider.fetch_metrics(&symbol).await {
                Ok(snapshot) => {
                    debug!(symbol = %symbol, "Metrics fetched");
                    Ok(snapshot)
                }
                Err(e) => {
                    warn!(
                        symbol = %symbol,
                        recoverable = e.is_recoverable(),
                        error = %e,
                        "Metrics fetch failed"
                    );
                    Err(FetchFailure::new(symbol, e.to_string()))
                }
            }
        })
    });

    join_all(handles)
        .await
        .into_iter()
        .zip(batch)
        .map(|(joined, symbol)| {
            joined.unwrap_or_else(|e| {
                warn!(symbol = %symbol, error = %e, "Fetch task aborted");
                Err(FetchFailure::new(symbol.clone(), format!("fetch task failed: {e}")))
            })
        })
        .collect()
}
