//! Batch scan orchestration and streaming.
//!
//! # Architecture
//!
//! ```text
//! ScanRequest ──▶ resolve_universe ──▶ BatchPlan ──▶ ScanSession
//!                                                        │
//!            ┌───────────────────────────────────────────┘
//!            ▼
//!   ScanOrchestrator (per cycle)
//!     for each batch:  fetch_batch (one task per symbol) ──▶ ScoringPipeline
//!     rank ──▶ filters ──▶ summarize
//!            │
//!            ▼
//!   Publisher ──▶ ResultSink (mpsc / broadcast / discard)
//! ```

pub mod batch;
pub mod events;
pub mod orchestrator;
pub mod publisher;
pub mod request;
pub mod result;
pub mod session;
pub mod sink;
pub mod summary;
pub mod universe;

pub use batch::{fetch_batch, BatchPlan};
pub use events::ScanEvent;
pub use orchestrator::{CycleReport, ScanHandle, ScanOrchestrator, SessionOutcome};
pub use request::{ScanFilters, ScanMode, ScanRequest};
pub use result::{rank, ScanOutcome, ScanResult};
pub use session::{ScanSession, SessionState, SessionStatus};
pub use sink::{DiscardSink, ResultSink, SinkClosed};
pub use summary::{summarize, Summary, TopSqueeze};
pub use universe::{resolve_universe, DEFAULT_WATCHLIST, EXPANDED_UNIVERSE};
