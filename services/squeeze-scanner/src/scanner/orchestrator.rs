//! Scan orchestration.
//!
//! The orchestrator turns a [`ScanRequest`] into a [`ScanSession`] and
//! drives it: batches are fetched one after another with a pause in
//! between, each batch fans out one task per symbol, results are scored,
//! ranked, filtered and streamed to the session's sink. In continuous mode
//! the cycle repeats until the session is stopped, the subscriber leaves or
//! the cycle cap is reached.

use chrono::Utc;
use squeeze_common::{ScannerConfig, Validate};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use super::batch::{fetch_batch, BatchPlan};
use super::events::{progress_percentage, ScanEvent};
use super::publisher::Publisher;
use super::request::{ScanMode, ScanRequest};
use super::result::{rank, ScanResult};
use super::session::{ScanSession, SessionState};
use super::sink::{DiscardSink, ResultSink};
use super::summary::{summarize, Summary};
use super::universe::resolve_universe;
use crate::data::MetricsProvider;
use crate::error::ScanError;
use crate::scoring::ScoringPipeline;

// ============================================================================
// Outcomes
// ============================================================================

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stopped, disconnected or out of cycles
    Finished { total_cycles: u32 },
    /// Could not run (provider not ready)
    Failed { reason: String },
}

/// How a single cycle ended.
#[derive(Debug)]
enum CycleOutcome {
    Completed(CycleReport),
    Cancelled,
    Failed(String),
}

/// Ranked, filtered results of one cycle and their rollup.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub results: Vec<ScanResult>,
    pub summary: Summary,
}

/// A running session.
pub struct ScanHandle {
    session: Arc<ScanSession>,
    task: JoinHandle<SessionOutcome>,
}

impl ScanHandle {
    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    pub fn stop(&self) {
        self.session.cancel();
    }

    /// Wait for the session to end.
    pub async fn join(self) -> SessionOutcome {
        self.task.await.unwrap_or_else(|e| SessionOutcome::Failed {
            reason: format!("scan task failed: {e}"),
        })
    }
}

// ============================================================================
// Scan Orchestrator
// ============================================================================

/// Drives scan sessions against one metrics provider.
#[derive(Clone)]
pub struct ScanOrchestrator {
    provider: Arc<dyn MetricsProvider>,
    pipeline: Arc<ScoringPipeline>,
    config: ScannerConfig,
}

impl ScanOrchestrator {
    pub fn new(provider: Arc<dyn MetricsProvider>, pipeline: Arc<ScoringPipeline>, config: ScannerConfig) -> Self {
        Self {
            provider,
            pipeline,
            config,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Validate a request and build its session. Nothing is fetched yet.
    pub fn prepare(&self, request: &ScanRequest) -> Result<Arc<ScanSession>, ScanError> {
        self.config.validate()?;
        request.filters.validate()?;

        let symbols = resolve_universe(&request.symbols, request.use_expanded_universe, &self.config)?;
        let plan = BatchPlan::new(symbols, self.config.batch_size)?;

        let mode = request.mode();
        let max_cycles = match mode {
            ScanMode::OneShot => 1,
            ScanMode::Continuous => self.config.max_continuous_cycles,
        };

        info!(
            symbols = plan.total(),
            batches = plan.batch_count(),
            mode = %mode,
            "Scan session prepared"
        );

        Ok(Arc::new(ScanSession::new(plan, request.filters, mode, max_cycles)))
    }

    /// Run a session to its end, streaming events into `sink`.
    pub async fn run(&self, session: Arc<ScanSession>, sink: Arc<dyn ResultSink>) -> SessionOutcome {
        let span = squeeze_common::scan_span!(session.id(), mode = %session.mode());
        self.run_session(session, sink).instrument(span).await
    }

    /// Run a session on its own task.
    pub fn spawn(&self, session: Arc<ScanSession>, sink: Arc<dyn ResultSink>) -> ScanHandle {
        let orchestrator = self.clone();
        let task_session = Arc::clone(&session);
        let task = tokio::spawn(async move { orchestrator.run(task_session, sink).await });

        ScanHandle { session, task }
    }

    /// Request/response scan: one cycle, no streaming, final results only.
    pub async fn scan_once(&self, request: &ScanRequest) -> Result<CycleReport, ScanError> {
        let request = ScanRequest {
            continuous: false,
            ..request.clone()
        };
        let session = self.prepare(&request)?;
        let publisher = Publisher::new(Arc::clone(&session), Arc::new(DiscardSink));

        match self.run_cycle(&session, &publisher, 1, Duration::ZERO).await {
            CycleOutcome::Completed(report) => Ok(report),
            CycleOutcome::Failed(reason) => Err(ScanError::Session(reason)),
            CycleOutcome::Cancelled => Err(ScanError::Session("scan cancelled".into())),
        }
    }

    async fn run_session(&self, session: Arc<ScanSession>, sink: Arc<dyn ResultSink>) -> SessionOutcome {
        let publisher = Publisher::new(Arc::clone(&session), sink);
        let done = session.cancellation_token().child_token();

        let drive = async {
            let outcome = self.drive_session(&session, &publisher).await;
            done.cancel();
            outcome
        };
        let (outcome, ()) = tokio::join!(drive, publisher.watch_subscriber(done.clone()));
        outcome
    }

    async fn drive_session(&self, session: &ScanSession, publisher: &Publisher) -> SessionOutcome {
        let stagger = Duration::from_millis(self.config.item_stagger_ms);
        let interval = Duration::from_secs(self.config.cycle_interval_secs);

        info!(symbols = session.plan().total(), max_cycles = session.max_cycles(), "Scan session started");
        session.set_state(SessionState::Running).await;

        let mut cycle = 0u32;
        loop {
            if session.is_cancelled() {
                break;
            }
            cycle += 1;

            match self.run_cycle(session, publisher, cycle, stagger).await {
                CycleOutcome::Completed(_) => {}
                CycleOutcome::Cancelled => break,
                CycleOutcome::Failed(reason) => {
                    warn!(cycle, reason = %reason, "Scan session failed");
                    session.set_state(SessionState::Failed).await;
                    publisher.fail(reason.clone()).await;
                    return SessionOutcome::Failed { reason };
                }
            }

            if session.cycles_exhausted() || session.is_cancelled() {
                break;
            }

            let waiting = ScanEvent::Waiting {
                cycle,
                next_scan_in_secs: interval.as_secs(),
            };
            if !publisher.emit(waiting).await {
                break;
            }
            session.set_state(SessionState::Waiting).await;

            if !session.pause(interval).await {
                break;
            }
            session.set_state(SessionState::Running).await;
        }

        let total_cycles = session.completed_cycles();
        session.set_state(SessionState::Finished).await;
        publisher.finish(total_cycles).await;

        SessionOutcome::Finished { total_cycles }
    }

    /// One full cycle: readiness check, batches, ranking, item updates,
    /// completion.
    async fn run_cycle(
        &self,
        session: &ScanSession,
        publisher: &Publisher,
        cycle: u32,
        stagger: Duration,
    ) -> CycleOutcome {
        if let Err(e) = self.provider.ensure_ready().await {
            return CycleOutcome::Failed(e.to_string());
        }

        let started = ScanEvent::Started {
            cycle,
            endpoint: self.provider.name().to_string(),
            timestamp: Utc::now(),
        };
        if !publisher.emit(started).await {
            return CycleOutcome::Cancelled;
        }

        let Some(mut results) = self.fetch_all(session, publisher, cycle).await else {
            return CycleOutcome::Cancelled;
        };

        rank(&mut results);
        let results = session.filters().apply(results);
        let summary = summarize(&results);

        let total = results.len();
        for (index, result) in results.iter().enumerate() {
            let update = ScanEvent::ItemUpdate {
                cycle,
                index,
                total,
                result: result.clone(),
            };
            if !publisher.emit(update).await {
                return CycleOutcome::Cancelled;
            }
            if index + 1 < total && !session.pause(stagger).await {
                return CycleOutcome::Cancelled;
            }
        }

        let complete = ScanEvent::Complete {
            cycle,
            results: results.clone(),
            summary: summary.clone(),
            timestamp: Utc::now(),
        };
        if !publisher.emit(complete).await {
            return CycleOutcome::Cancelled;
        }

        let completed = session.record_cycle();
        info!(
            cycle,
            completed,
            results = total,
            legendary = summary.legendary,
            errors = summary.errors,
            "Scan cycle complete"
        );

        CycleOutcome::Completed(CycleReport { results, summary })
    }

    /// Fetch and score every batch of the plan. `None` when cancelled.
    async fn fetch_all(&self, session: &ScanSession, publisher: &Publisher, cycle: u32) -> Option<Vec<ScanResult>> {
        let plan = session.plan();
        let batch_count = plan.batch_count();
        let batch_delay = Duration::from_millis(self.config.batch_delay_ms);
        let mut results = Vec::with_capacity(plan.total());

        for (i, batch) in plan.batches().iter().enumerate() {
            if session.is_cancelled() {
                return None;
            }

            let fetching = ScanEvent::Progress {
                cycle,
                percentage: progress_percentage(i, batch_count),
                message: format!("Fetching batch {}/{} ({} symbols)", i + 1, batch_count, batch.len()),
            };
            if !publisher.emit(fetching).await {
                return None;
            }

            let outcomes = fetch_batch(&self.provider, batch).await;
            results.extend(
                outcomes
                    .into_iter()
                    .map(|outcome| ScanResult::from_outcome(outcome, &self.pipeline)),
            );

            let fetched = ScanEvent::Progress {
                cycle,
                percentage: progress_percentage(i + 1, batch_count),
                message: format!("Batch {}/{} complete", i + 1, batch_count),
            };
            if !publisher.emit(fetched).await {
                return None;
            }

            if i + 1 < batch_count && !session.pause(batch_delay).await {
                return None;
            }
        }

        Some(results)
    }
}
