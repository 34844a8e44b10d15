//! # Health and Metrics Endpoint
//!
//! - `GET /health/liveness`: 200 `ok` while the process runs.
//! - `GET /health/readiness`: 200 `ready` when the repository answers,
//!   503 otherwise.
//! - `GET /metrics`: Prometheus text exposition of the sweep metrics.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use nisinp_engine::SweepMetrics;
use nisinp_store::IncidentRepository;

/// Shared state of the probe handlers.
#[derive(Clone)]
pub struct ProbeState {
    /// Checked by readiness.
    pub repository: Arc<dyn IncidentRepository>,
    /// Encoded by `/metrics`.
    pub metrics: SweepMetrics,
}

/// The probe router.
pub fn router(state: ProbeState) -> Router {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<ProbeState>) -> impl IntoResponse {
    if let Err(e) = state.repository.ping().await {
        tracing::warn!("repository health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "repository unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}

async fn prometheus_metrics(State(state): State<ProbeState>) -> impl IntoResponse {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
