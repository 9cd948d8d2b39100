//! Handlers for the `/runs/{run_id}/verdicts` resource.
//!
//! Test handlers `POST` their verdict here; the failure locator rendered by
//! the entry point points at the `GET` side.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use smoke_core::types::RunId;
use smoke_core::verdict::{VerdictRecord, VerdictReport};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/runs/{run_id}/verdicts
///
/// Append one verdict to the run's feed partition. Returns 201 with the
/// stamped record, 400 on a malformed run id or report.
pub async fn report_verdict(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(report): Json<VerdictReport>,
) -> AppResult<(StatusCode, Json<DataResponse<VerdictRecord>>)> {
    let run_id: RunId = run_id.parse()?;
    let record = report.into_record()?;

    state.feed.append(run_id, record.clone()).await?;
    tracing::info!(
        run_id = %run_id,
        test_name = %record.test_name,
        passed = record.passed,
        source = state.feed.kind(),
        "Verdict reported"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/runs/{run_id}/verdicts
///
/// Every verdict reported for the run, in arrival order. Unknown runs yield
/// an empty list.
pub async fn list_verdicts(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<VerdictRecord>>>> {
    let run_id: RunId = run_id.parse()?;
    let records = state.feed.records(run_id).await?;
    Ok(Json(DataResponse { data: records }))
}

