//! Scan lifecycle events.
//!
//! Per cycle a subscriber sees:
//!
//! ```text
//! Started ─▶ Progress (per batch, start + end) ─▶ ItemUpdate × N ─▶ Complete
//!                                                                     │
//!                 continuous mode: Waiting ─▶ next cycle ◀────────────┘
//! ```
//!
//! and the session ends with a single `Finished`, or with `Error` when it
//! could not run at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::ScanResult;
use super::summary::Summary;

/// Event pushed to scan subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A cycle began
    Started {
        cycle: u32,
        /// Provider serving the cycle
        endpoint: String,
        timestamp: DateTime<Utc>,
    },

    /// Batch progress, 0-100
    Progress {
        cycle: u32,
        percentage: u8,
        message: String,
    },

    /// One ranked result
    ItemUpdate {
        cycle: u32,
        index: usize,
        total: usize,
        result: ScanResult,
    },

    /// The cycle's full ranked result set
    Complete {
        cycle: u32,
        results: Vec<ScanResult>,
        summary: Summary,
        timestamp: DateTime<Utc>,
    },

    /// Continuous mode is sleeping until the next cycle
    Waiting { cycle: u32, next_scan_in_secs: u64 },

    /// The session could not continue
    Error { reason: String },

    /// The session ended
    Finished {
        total_cycles: u32,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "scan-started",
            Self::Progress { .. } => "scan-progress",
            Self::ItemUpdate { .. } => "stock-update",
            Self::Complete { .. } => "scan-complete",
            Self::Waiting { .. } => "scan-waiting",
            Self::Error { .. } => "scan-error",
            Self::Finished { .. } => "scan-finished",
        }
    }

    /// Whether no event follows this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Finished { .. })
    }

    /// Cycle the event belongs to, if any.
    pub fn cycle(&self) -> Option<u32> {
        match self {
            Self::Started { cycle, .. }
            | Self::Progress { cycle, .. }
            | Self::ItemUpdate { cycle, .. }
            | Self::Complete { cycle, .. }
            | Self::Waiting { cycle, .. } => Some(*cycle),
            Self::Error { .. } | Self::Finished { .. } => None,
        }
    }
}

/// Progress percentage after `done` of `total` batches.
pub fn progress_percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((100 * done.min(total)) / total) as u8
}
