//! HTTP API for a polling CTG dashboard.
//!
//! The frontend polls `/api/stream` for new samples and `/api/analysis` for
//! the latest classification, and reads the flag timeline from
//! `/api/flags` and `/api/report`.
//!
//! # Architecture
//!
//! ```text
//! Dashboard ──→ GET /api/stream ───→ ┌──────────────┐
//!           ──→ GET /api/analysis ─→ │ SharedSession│ (one lock per request)
//!           ──→ POST /api/jump ────→ └──────────────┘
//! ```

use crate::core::classifier::{Category, ClassificationResult, Severity};
use crate::core::cursor::round1;
use crate::core::flags::Flag;
use crate::core::session::{FlagListing, ReportEntry, SharedSession, StreamChunk};
use crate::error::AnalysisError;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(port: u16, allowed_origins: Vec<String>) -> Self {
        Self {
            port,
            allowed_origins,
        }
    }
}

/// Shared server state
pub struct ServerState {
    session: SharedSession,
}

impl ServerState {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }
}

/// Classification metrics as reported to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsView {
    pub baseline_bpm: f64,
    pub variability_index: f64,
    pub status: String,
    pub category: Category,
    pub interpretation_details: String,
    pub severity: Severity,
    pub accelerations_count: usize,
    /// Short labels of early/late/variable decelerations
    pub decelerations: Vec<String>,
    pub prolonged_decelerations: usize,
}

impl From<&ClassificationResult> for MetricsView {
    fn from(result: &ClassificationResult) -> Self {
        let summary = &result.event_summary;
        Self {
            baseline_bpm: round1(result.baseline_bpm),
            variability_index: round1(result.variability),
            status: result.status.clone(),
            category: result.category,
            interpretation_details: result.rationale.clone(),
            severity: result.severity,
            accelerations_count: summary.accelerations,
            decelerations: summary
                .decelerations
                .iter()
                .map(|kind| kind.short_label().to_string())
                .collect(),
            prolonged_decelerations: summary.prolonged,
        }
    }
}

/// Response from the analysis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub metrics: Option<MetricsView>,
    pub flags: Vec<Flag>,
}

/// Response from the report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Vec<ReportEntry>,
    pub generated_at: String,
}

/// Body of POST /api/jump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpRequest {
    pub time_seconds: f64,
}

/// Response from POST /api/jump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpResponse {
    pub status: String,
    pub time: f64,
}

/// Response from POST /api/reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: AnalysisError) -> ApiError {
    let status = match err {
        AnalysisError::EmptySequence => StatusCode::CONFLICT,
        AnalysisError::InsufficientData { .. } | AnalysisError::InvalidWindow(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    tracing::warn!("Request failed: {}", err);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/stream
async fn stream(State(state): State<Arc<ServerState>>) -> Json<StreamChunk> {
    Json(state.session.lock().advance_and_report())
}

/// GET /api/analysis
async fn analysis(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let outcome = state.session.lock().analyze().map_err(api_error)?;
    Ok(Json(AnalysisResponse {
        metrics: outcome.metrics.as_ref().map(MetricsView::from),
        flags: outcome.flags,
    }))
}

/// GET /api/report
async fn report(State(state): State<Arc<ServerState>>) -> Json<ReportResponse> {
    let report = state.session.lock().report();
    Json(ReportResponse {
        report,
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// GET /api/flags
async fn flags(State(state): State<Arc<ServerState>>) -> Json<FlagListing> {
    Json(state.session.lock().list_flags())
}

/// POST /api/jump
async fn jump(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<JumpResponse>, ApiError> {
    state
        .session
        .lock()
        .jump(req.time_seconds)
        .map_err(api_error)?;
    Ok(Json(JumpResponse {
        status: "Jumped".to_string(),
        time: req.time_seconds,
    }))
}

/// POST /api/reset
async fn reset(State(state): State<Arc<ServerState>>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.lock().reset().map_err(api_error)?;
    Ok(Json(StatusResponse {
        status: "Reset".to_string(),
    }))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router over a shared session.
pub fn router(session: SharedSession, allowed_origins: &[String]) -> Router {
    let state = Arc::new(ServerState::new(session));

    Router::new()
        .route("/health", get(health))
        .route("/api/stream", get(stream))
        .route("/api/analysis", get(analysis))
        .route("/api/report", get(report))
        .route("/api/flags", get(flags))
        .route("/api/jump", post(jump))
        .route("/api/reset", post(reset))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    session: SharedSession,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(session, &config.allowed_origins);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("CTG monitor listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{EventKind, EventSummary};
    use crate::core::classifier::Finding;

    #[test]
    fn test_metrics_view_rounds_and_labels() {
        let result = ClassificationResult {
            baseline_bpm: 141.26,
            variability: 7.04,
            category: Category::II,
            finding: Finding::LateDecelerations,
            status: Finding::LateDecelerations.label().to_string(),
            severity: Severity::Medium,
            rationale: "late".to_string(),
            event_summary: EventSummary {
                accelerations: 1,
                decelerations: vec![EventKind::LateDecel, EventKind::VariableDecel],
                prolonged: 0,
            },
        };
        let view = MetricsView::from(&result);
        assert_eq!(view.baseline_bpm, 141.3);
        assert_eq!(view.variability_index, 7.0);
        assert_eq!(view.decelerations, vec!["Late", "Variable"]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["category"], "II");
        assert_eq!(json["interpretation_details"], "late");
    }

    #[test]
    fn test_error_status_codes() {
        let (status, body) = api_error(AnalysisError::EmptySequence);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "EMPTY_SEQUENCE");

        let (status, body) = api_error(AnalysisError::InvalidWindow("nan".to_string()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "INVALID_WINDOW");
    }
}
