//! Handler for the top-level run entry point.

use axum::extract::State;

use crate::engine::coordinator::RunResponse;
use crate::state::AppState;

/// GET|POST /integration-tests
///
/// Run the whole suite once and answer with a plain-text verdict:
/// `200 PASS` or `500 FAIL - ...`.
pub async fn run_integration_tests(State(state): State<AppState>) -> RunResponse {
    let coordinator = state.engine.coordinator();
    tracing::info!(
        run_id = %coordinator.run_id(),
        expected = state.engine.expected_count(),
        "Starting integration run"
    );

    let report = coordinator.run().await;
    tracing::info!(
        run_id = %report.run_id,
        passed = report.passed(),
        state = ?report.state,
        "Integration run finished"
    );
    report.render()
}
