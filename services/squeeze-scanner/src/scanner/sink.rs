//! Event delivery to subscribers.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use super::events::ScanEvent;

/// The subscriber is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Result sink closed")]
pub struct SinkClosed;

/// Where a scan session sends its events.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver one event. `SinkClosed` stops the session.
    async fn deliver(&self, event: ScanEvent) -> Result<(), SinkClosed>;

    /// Resolves once the subscriber is gone. Sinks without a disconnect
    /// signal never resolve and report closure on the next delivery.
    async fn disconnected(&self) {
        std::future::pending::<()>().await;
    }
}

/// Ordered, lossless delivery to a single subscriber. Applies backpressure
/// when the channel is full.
#[async_trait]
impl ResultSink for mpsc::Sender<ScanEvent> {
    async fn deliver(&self, event: ScanEvent) -> Result<(), SinkClosed> {
        self.send(event).await.map_err(|_| SinkClosed)
    }

    async fn disconnected(&self) {
        mpsc::Sender::closed(self).await;
    }
}

/// Fan-out to every current subscriber. Slow subscribers may lag; having no
/// subscriber left counts as closed.
#[async_trait]
impl ResultSink for broadcast::Sender<ScanEvent> {
    async fn deliver(&self, event: ScanEvent) -> Result<(), SinkClosed> {
        self.send(event).map(|_| ()).map_err(|_| SinkClosed)
    }
}

/// Accepts and drops everything. Backs request/response scans, which only
/// need the final result set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl ResultSink for DiscardSink {
    async fn deliver(&self, _event: ScanEvent) -> Result<(), SinkClosed> {
        Ok(())
    }
}
