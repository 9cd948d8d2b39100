use axum::routing::get;
use axum::Router;

use crate::handlers::integration;
use crate::state::AppState;

/// Mount the run entry point (root-level, NOT under `/api/v1`).
///
/// ```text
/// GET  /integration-tests                          run the full suite
/// POST /integration-tests                          run the full suite
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/integration-tests",
        get(integration::run_integration_tests).post(integration::run_integration_tests),
    )
}
