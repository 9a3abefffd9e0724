//! Squeeze Scanner Library
//!
//! Scores securities for short-squeeze risk from short-side market data and
//! scans whole symbol universes in rate-limited batches, streaming progress
//! to subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   squeeze-scanner (Rust Service)                    │
//! │                              :4480                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │ MetricsProvider │─▶│ ScanOrchestrator│─▶│ ScoringPipeline │      │
//! │  │ (Ortex / demo)  │  │ (batches, SSE)  │  │ (score/classify)│      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Holy Grail score
//! A 0-100 composite of short interest, utilization, cost-to-borrow and
//! days-to-cover, each weighted and capped on its own.
//!
//! ## Squeeze classification
//! An ordered rule table maps score and metrics to a squeeze type
//! (gamma/short combo, classic squeeze, borrowing crisis, ...) and timing
//! (early, building, imminent).

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod error;
pub mod routes;
pub mod scanner;
pub mod scoring;

pub use error::ScanError;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use squeeze_common::{Config, ProviderKind};

use crate::data::{DemoProvider, MetricsProvider, OrtexProvider};
use crate::scanner::{ScanOrchestrator, ScanSession};
use crate::scoring::{ScoringConfig, ScoringPipeline};

/// Build the metrics provider selected in the config.
pub fn build_provider(config: &Config) -> Arc<dyn MetricsProvider> {
    match config.provider.kind {
        ProviderKind::Demo => Arc::new(DemoProvider::new()),
        ProviderKind::Ortex => Arc::new(OrtexProvider::from_config(config)),
    }
}

/// Scanner service state
pub struct ScannerState {
    /// Configuration
    pub config: Config,
    /// Scan orchestrator
    pub orchestrator: ScanOrchestrator,
    /// Live streaming sessions, by id
    pub sessions: RwLock<HashMap<Uuid, Arc<ScanSession>>>,
}

impl ScannerState {
    /// Create state with the provider selected in the config.
    pub fn new(config: Config) -> Result<Self> {
        let provider = build_provider(&config);
        Self::with_provider(config, provider)
    }

    /// Create state around an explicit provider.
    pub fn with_provider(config: Config, provider: Arc<dyn MetricsProvider>) -> Result<Self> {
        let scoring = ScoringConfig::from_config(&config)?;
        let pipeline = Arc::new(ScoringPipeline::new(scoring));
        let orchestrator = ScanOrchestrator::new(provider, pipeline, config.scanner.clone());

        Ok(Self {
            config,
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn register(&self, session: Arc<ScanSession>) {
        self.sessions.write().await.insert(session.id(), session);
    }

    pub async fn unregister(&self, id: &Uuid) {
        self.sessions.write().await.remove(id);
    }

    pub async fn session(&self, id: &Uuid) -> Option<Arc<ScanSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Cancel every live session.
    pub async fn stop_all(&self) {
        for session in self.sessions.read().await.values() {
            session.cancel();
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ScannerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/scan", post(routes::scan))
        .route("/api/v1/scan/stream", post(routes::scan_stream))
        .route("/api/v1/scan/sessions", get(routes::list_sessions))
        .route("/api/v1/scan/:id", get(routes::session_status))
        .route("/api/v1/scan/:id/stop", post(routes::stop_scan))
        .layer(cors)
        .with_state(state)
}

/// Main scanner service
pub struct ScannerService {
    state: Arc<ScannerState>,
}

impl ScannerService {
    /// Create a new scanner service
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ScannerState::new(config)?),
        })
    }

    pub fn state(&self) -> &Arc<ScannerState> {
        &self.state
    }

    /// Serve HTTP until Ctrl-C, then stop every running session.
    pub async fn start(self) -> Result<()> {
        let network = &self.state.config.network;
        let addr: SocketAddr = format!("{}:{}", network.bind, network.port).parse()?;

        let app = build_router(Arc::clone(&self.state));

        tracing::info!(
            address = %addr,
            provider = self.state.orchestrator.provider_name(),
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let state = Arc::clone(&self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Shutdown requested, stopping scan sessions");
                state.stop_all().await;
            })
            .await?;

        Ok(())
    }
}
