//! Session-aware event publishing.
//!
//! Every event goes through [`Publisher::emit`], which checks the session's
//! cancellation first. After a stop only the closing `Finished` (or an
//! `Error`) can still go out.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::events::ScanEvent;
use super::session::ScanSession;
use super::sink::ResultSink;

pub struct Publisher {
    session: Arc<ScanSession>,
    sink: Arc<dyn ResultSink>,
}

impl Publisher {
    pub fn new(session: Arc<ScanSession>, sink: Arc<dyn ResultSink>) -> Self {
        Self { session, sink }
    }

    /// Send a lifecycle event. Returns `false` when the event was dropped
    /// because the session is cancelled or the subscriber went away; the
    /// caller should wind the session down.
    pub async fn emit(&self, event: ScanEvent) -> bool {
        if self.session.is_cancelled() {
            debug!(event = event.event_name(), "Session cancelled, event dropped");
            return false;
        }
        self.deliver(event).await
    }

    /// Send the closing `Finished` event, regardless of cancellation.
    pub async fn finish(&self, total_cycles: u32) {
        info!(total_cycles, "Scan session finished");
        self.deliver(ScanEvent::Finished {
            total_cycles,
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Send an `Error` event, regardless of cancellation.
    pub async fn fail(&self, reason: impl Into<String>) {
        self.deliver(ScanEvent::Error { reason: reason.into() }).await;
    }

    /// Cancel the session as soon as the subscriber disconnects, so sleeps
    /// end early. Returns when that happens or when `done` is cancelled.
    pub async fn watch_subscriber(&self, done: CancellationToken) {
        tokio::select! {
            () = self.sink.disconnected() => {
                info!("Subscriber disconnected, cancelling session");
                self.session.cancel();
            }
            () = done.cancelled() => {}
        }
    }

    async fn deliver(&self, event: ScanEvent) -> bool {
        let name = event.event_name();
        let cycle = event.cycle();
        match self.sink.deliver(event).await {
            Ok(()) => {
                debug!(event = name, cycle = ?cycle, "Event delivered");
                true
            }
            Err(e) => {
                info!(event = name, error = %e, "Subscriber gone, cancelling session");
                self.session.cancel();
                false
            }
        }
    }
}
