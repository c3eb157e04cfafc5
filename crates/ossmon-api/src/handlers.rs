//! Exposition handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::trace;

use crate::ApiState;

/// Content type of the Prometheus text format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    trace!(series = snapshot.len(), "rendering metrics");

    let body = ossmon_metrics::render_prometheus(&snapshot);
    (
        StatusCode::OK,
        [("content-type", PROMETHEUS_CONTENT_TYPE)],
        body,
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
