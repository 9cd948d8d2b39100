//! One end-to-end run.
//!
//! A [`RunCoordinator`] is created per request and consumed by
//! [`RunCoordinator::run`]. It subscribes to the run's feed partition
//! *before* dispatching, so a handler that reports faster than the dispatch
//! acknowledgements arrive is never missed, then waits for the fan-out and
//! finally for the fan-in.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use smoke_core::run_state::RunState;
use smoke_core::types::RunId;
use smoke_core::verdict::RunOutcome;
use smoke_events::{FeedError, VerdictSource};
use smoke_platform::rest::verdicts::realtime_verdicts_locator;

use super::aggregator::{AggregateError, Aggregator};
use super::dispatcher::{DispatchError, Dispatcher};

/// Why a run ended without a verdict from the tests themselves.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Verdict feed unavailable: {0}")]
    Feed(#[from] FeedError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
}

// ---------------------------------------------------------------------------
// RunCoordinator
// ---------------------------------------------------------------------------

pub struct RunCoordinator {
    run_id: RunId,
    state: RunState,
    dispatcher: Arc<Dispatcher>,
    aggregator: Aggregator,
    source: Arc<dyn VerdictSource>,
    locator: String,
}

impl RunCoordinator {
    /// Start a new run with a freshly generated id.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        aggregator: Aggregator,
        source: Arc<dyn VerdictSource>,
        locator: &Locator,
    ) -> Self {
        let run_id = RunId::generate();
        Self {
            run_id,
            state: RunState::Created,
            dispatcher,
            aggregator,
            source,
            locator: locator.for_run(run_id),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal run transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::info!(run_id = %self.run_id, from = ?self.state, to = ?next, "Run state changed");
        self.state = next;
    }

    /// Drive the run to a terminal state.
    pub async fn run(mut self) -> RunReport {
        self.transition(RunState::Dispatching);
        let result = self.execute().await;

        let terminal = match &result {
            Ok(RunOutcome::Pass) => RunState::Passed,
            Ok(RunOutcome::Fail { .. }) | Err(_) => RunState::Failed,
        };
        self.transition(terminal);

        RunReport {
            run_id: self.run_id,
            state: self.state,
            result,
            locator: self.locator,
        }
    }

    async fn execute(&mut self) -> Result<RunOutcome, RunError> {
        let subscription = self.source.subscribe(self.run_id).await?;

        // On failure the subscription is dropped here, before any counting.
        self.dispatcher.dispatch(self.run_id).await?;

        self.transition(RunState::Aggregating);
        let outcome = self
            .aggregator
            .await_outcome(
                subscription,
                self.aggregator
                    .expected_count(self.dispatcher.expected_count()),
            )
            .await?;
        Ok(outcome)
    }
}

/// Where a failed run sends the caller to read every verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// The verdict routes of this service, under its public base URL.
    Service(String),
    /// The run's node in the realtime store, under its database URL.
    Realtime(String),
}

impl Locator {
    pub fn for_run(&self, run_id: RunId) -> String {
        match self {
            Locator::Service(base) => format!(
                "{}/api/v1/runs/{run_id}/verdicts",
                base.trim_end_matches('/')
            ),
            Locator::Realtime(database_url) => realtime_verdicts_locator(database_url, run_id),
        }
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Final record of a run, as handed back to the entry endpoint.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: RunState,
    pub result: Result<RunOutcome, RunError>,
    pub locator: String,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_ok_and(RunOutcome::is_pass)
    }

    /// Render the caller-facing status and body.
    pub fn render(&self) -> RunResponse {
        match &self.result {
            Ok(RunOutcome::Pass) => RunResponse {
                status: StatusCode::OK,
                body: "PASS".to_string(),
            },
            Ok(RunOutcome::Fail { test_name, details }) => {
                let reason = details
                    .as_deref()
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default();
                RunResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: format!(
                        "FAIL - test {test_name} failed{reason}; details at {}",
                        self.locator
                    ),
                }
            }
            Err(_) => RunResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("FAIL - details at {}", self.locator),
            },
        }
    }
}

/// Plain-text HTTP answer of the entry endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResponse {
    pub status: StatusCode,
    pub body: String,
}

impl IntoResponse for RunResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
