pub mod health;
pub mod integration;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /runs/{run_id}/verdicts                          report (POST), list (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/runs", runs::router())
}
