//! Verdict fan-in.
//!
//! [`Aggregator::await_outcome`] reads one run's feed partition in append
//! order and stops at the first terminal condition:
//!
//! - a failing record resolves `Fail` immediately, later records are never read;
//! - `expected` distinct passing names resolve `Pass`;
//! - a repeated name is logged and does not count towards completion;
//! - with a known-test set, names outside it are logged and skipped.
//!
//! The subscription is consumed, so it is released on every exit path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use smoke_core::verdict::{RunOutcome, VerdictRecord};
use smoke_events::Subscription;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Nothing to wait for; a run with no expected verdicts proves nothing.
    #[error("Expected verdict count is zero")]
    EmptySuite,

    #[error("Verdict feed closed after {received} of {expected} verdicts")]
    FeedClosed { received: usize, expected: usize },

    #[error("Deadline elapsed after {received} of {expected} verdicts")]
    DeadlineElapsed { received: usize, expected: usize },
}

/// Fan-in over a verdict subscription, with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    deadline: Option<Duration>,
    known_tests: Option<Arc<HashSet<String>>>,
}

impl Aggregator {
    /// `None` waits for as long as it takes.
    pub fn new(deadline: Option<Duration>) -> Self {
        Self {
            deadline,
            known_tests: None,
        }
    }

    /// Count only verdicts whose name is in `names`.
    pub fn with_known_tests<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_tests = Some(Arc::new(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Verdicts a run must collect once `dispatched` stimuli were accepted.
    pub fn expected_count(&self, dispatched: usize) -> usize {
        self.known_tests
            .as_ref()
            .map_or(dispatched, |known| known.len())
    }

    /// Wait for the run behind `subscription` to reach a terminal outcome.
    pub async fn await_outcome(
        &self,
        mut subscription: Subscription,
        expected: usize,
    ) -> Result<RunOutcome, AggregateError> {
        let run_id = subscription.run_id();
        if expected == 0 {
            subscription.unsubscribe();
            return Err(AggregateError::EmptySuite);
        }

        let mut tally = Tally::new(expected, self.known_tests.clone());
        let result = match self.deadline {
            Some(limit) => {
                let waited =
                    tokio::time::timeout(limit, fold(&mut subscription, &mut tally)).await;
                match waited {
                    Ok(result) => result,
                    Err(_) => Err(AggregateError::DeadlineElapsed {
                        received: tally.distinct(),
                        expected,
                    }),
                }
            }
            None => fold(&mut subscription, &mut tally).await,
        };
        subscription.unsubscribe();

        match &result {
            Ok(RunOutcome::Pass) => {
                tracing::info!(run_id = %run_id, expected, "All tests passed");
            }
            Ok(RunOutcome::Fail { test_name, details }) => tracing::warn!(
                run_id = %run_id,
                test_name = %test_name,
                details = details.as_deref().unwrap_or(""),
                arrivals = tally.arrivals,
                "Test reported failure"
            ),
            Err(e) => tracing::error!(run_id = %run_id, error = %e, "Aggregation aborted"),
        }
        result
    }
}

async fn fold(
    subscription: &mut Subscription,
    tally: &mut Tally,
) -> Result<RunOutcome, AggregateError> {
    while let Some(record) = subscription.next().await {
        if let Some(outcome) = tally.observe(&record) {
            return Ok(outcome);
        }
        tracing::debug!(
            run_id = %subscription.run_id(),
            test_name = %record.test_name,
            received = tally.distinct(),
            expected = tally.expected,
            "Test passed, waiting for more"
        );
    }
    Err(AggregateError::FeedClosed {
        received: tally.distinct(),
        expected: tally.expected,
    })
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Per-run counting state, owned by a single aggregation.
#[derive(Debug)]
struct Tally {
    expected: usize,
    /// Every record observed, duplicates and unknown names included.
    arrivals: usize,
    passed: HashSet<String>,
    known: Option<Arc<HashSet<String>>>,
}

impl Tally {
    fn new(expected: usize, known: Option<Arc<HashSet<String>>>) -> Self {
        Self {
            expected,
            arrivals: 0,
            passed: HashSet::with_capacity(expected),
            known,
        }
    }

    fn distinct(&self) -> usize {
        self.passed.len()
    }

    /// Fold one record in; `Some` once the run is decided.
    fn observe(&mut self, record: &VerdictRecord) -> Option<RunOutcome> {
        self.arrivals += 1;

        if let Some(known) = &self.known {
            if !known.contains(&record.test_name) {
                tracing::warn!(
                    test_name = %record.test_name,
                    "Verdict for unknown test ignored"
                );
                return None;
            }
        }

        if !record.passed {
            return Some(RunOutcome::from(record));
        }

        if !self.passed.insert(record.test_name.clone()) {
            tracing::warn!(
                test_name = %record.test_name,
                "Duplicate passing verdict ignored"
            );
            return None;
        }

        (self.passed.len() >= self.expected).then_some(RunOutcome::Pass)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
