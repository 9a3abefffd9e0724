//! Scan session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::batch::BatchPlan;
use super::request::{ScanFilters, ScanMode};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Waiting,
    Finished,
    Failed,
}

/// Point-in-time view of a session, for status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub id: Uuid,
    pub mode: ScanMode,
    pub state: SessionState,
    pub completed_cycles: u32,
    pub max_cycles: u32,
    pub symbols: usize,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

/// One scan subscription: what to scan and how far it got.
///
/// The orchestrator task owns the session; handles and HTTP routes share it
/// to observe progress or cancel.
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    plan: BatchPlan,
    filters: ScanFilters,
    mode: ScanMode,
    max_cycles: u32,
    cancel: CancellationToken,
    completed_cycles: AtomicU32,
    state: RwLock<SessionState>,
    created_at: DateTime<Utc>,
}

impl ScanSession {
    pub fn new(plan: BatchPlan, filters: ScanFilters, mode: ScanMode, max_cycles: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan,
            filters,
            mode,
            max_cycles: max_cycles.max(1),
            cancel: CancellationToken::new(),
            completed_cycles: AtomicU32::new(0),
            state: RwLock::new(SessionState::Idle),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub fn filters(&self) -> &ScanFilters {
        &self.filters
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    // === Cancellation ===

    /// Request the session to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Sleep for `duration` unless cancelled first. Returns `true` when the
    /// full duration elapsed.
    pub async fn pause(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }

    // === Progress ===

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles.load(Ordering::SeqCst)
    }

    /// Count a completed cycle, returning the new total.
    pub fn record_cycle(&self) -> u32 {
        self.completed_cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the cycle cap has been reached.
    pub fn cycles_exhausted(&self) -> bool {
        self.completed_cycles() >= self.max_cycles
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            mode: self.mode,
            state: self.state().await,
            completed_cycles: self.completed_cycles(),
            max_cycles: self.max_cycles,
            symbols: self.plan.total(),
            cancelled: self.is_cancelled(),
            created_at: self.created_at,
        }
    }
}
