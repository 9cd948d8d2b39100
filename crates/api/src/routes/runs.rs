use axum::routing::get;
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/api/v1/runs`.
///
/// ```text
/// GET  /{run_id}/verdicts                          list verdicts of a run
/// POST /{run_id}/verdicts                          report a verdict
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{run_id}/verdicts",
        get(runs::list_verdicts).post(runs::report_verdict),
    )
}
