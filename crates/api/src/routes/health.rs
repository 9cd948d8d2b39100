use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Where verdicts are stored (`in_process` or `realtime`).
    pub verdict_source: &'static str,
    /// Number of run partitions held in memory; absent for external stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_partitions: Option<usize>,
}

/// GET /health -- returns service status and feed size.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        verdict_source: state.feed.kind(),
        feed_partitions: state.feed.partition_count().await,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
