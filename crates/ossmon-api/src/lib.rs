//! ossmon-api — HTTP exposition for the gauge store.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of every gauge |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use ossmon_metrics::GaugeStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: GaugeStore,
}

/// Build the exposition router.
pub fn build_router(store: GaugeStore) -> Router {
    let api_state = ApiState { store };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(api_state)
}
