//! HTTP routes for the scanner service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ScanError;
use crate::scanner::{ScanEvent, ScanMode, ScanRequest, ScanResult, SessionOutcome, SessionStatus, Summary};
use crate::ScannerState;

/// Response header carrying the id of a streaming session
pub const SESSION_HEADER: &str = "x-scan-session";

// ============================================================================
// Errors
// ============================================================================

/// Error response: `{ "success": false, "error": "..." }` with a matching status.
#[derive(Debug)]
pub struct ApiError(squeeze_common::Error);

impl From<squeeze_common::Error> for ApiError {
    fn from(e: squeeze_common::Error) -> Self {
        Self(e)
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub summary: Summary,
    pub results: Vec<ScanResult>,
    pub mode: String,
    pub provider: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionStatus>,
    pub count: usize,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<ScannerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "squeeze-scanner".to_string(),
        provider: state.orchestrator.provider_name().to_string(),
    })
}

/// Run one scan cycle and answer with the full result set
pub async fn scan(
    State(state): State<Arc<ScannerState>>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let report = state.orchestrator.scan_once(&request).await?;

    Ok(Json(ScanResponse {
        success: true,
        summary: report.summary,
        results: report.results,
        mode: if request.use_expanded_universe { "expanded" } else { "standard" }.to_string(),
        provider: state.orchestrator.provider_name().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

fn to_sse(event: &ScanEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.event_name()).json_data(event)
}

/// Turn a session's event channel into an SSE stream. The stream ends after
/// the terminal event or when the session drops its sender; dropping the
/// stream (client gone) closes the channel, which stops the session.
fn event_stream(rx: mpsc::Receiver<ScanEvent>) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(Some(rx), |rx| async move {
        let mut rx = rx?;
        let event = rx.recv().await?;
        let next = (!event.is_terminal()).then_some(rx);
        Some((to_sse(&event), next))
    })
}

/// Start a streaming scan session (one-shot or continuous) over SSE
pub async fn scan_stream(
    State(state): State<Arc<ScannerState>>,
    Json(request): Json<ScanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.orchestrator.prepare(&request)?;
    let id = session.id();
    let (tx, rx) = mpsc::channel(state.config.scanner.event_buffer);

    state.register(Arc::clone(&session)).await;
    let handle = state.orchestrator.spawn(session, Arc::new(tx));

    let registry = Arc::clone(&state);
    tokio::spawn(async move {
        match handle.join().await {
            SessionOutcome::Finished { total_cycles } => {
                tracing::debug!(session_id = %id, total_cycles, "Streaming session ended");
            }
            SessionOutcome::Failed { reason } => {
                tracing::warn!(session_id = %id, reason = %reason, "Streaming session failed");
            }
        }
        registry.unregister(&id).await;
    });

    tracing::info!(
        session_id = %id,
        continuous = request.mode() == ScanMode::Continuous,
        "Streaming scan started"
    );

    let sse = Sse::new(event_stream(rx)).keep_alive(KeepAlive::default());
    Ok(([(SESSION_HEADER, id.to_string())], sse))
}

/// Stop a streaming session
pub async fn stop_scan(
    State(state): State<Arc<ScannerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StopResponse>, ApiError> {
    let session = state
        .session(&id)
        .await
        .ok_or_else(|| squeeze_common::Error::NotFound(format!("scan session {id}")))?;

    session.cancel();
    tracing::info!(session_id = %id, "Scan session stop requested");

    Ok(Json(StopResponse {
        success: true,
        session_id: id,
    }))
}

/// Status of one streaming session
pub async fn session_status(
    State(state): State<Arc<ScannerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = state
        .session(&id)
        .await
        .ok_or_else(|| squeeze_common::Error::NotFound(format!("scan session {id}")))?;

    Ok(Json(session.status().await))
}

/// List live streaming sessions
pub async fn list_sessions(State(state): State<Arc<ScannerState>>) -> Json<SessionsResponse> {
    let sessions: Vec<Arc<_>> = state.sessions.read().await.values().cloned().collect();

    let mut statuses = Vec::with_capacity(sessions.len());
    for session in sessions {
        statuses.push(session.status().await);
    }
    statuses.sort_by_key(|s| s.created_at);

    let count = statuses.len();
    Json(SessionsResponse {
        sessions: statuses,
        count,
    })
}
