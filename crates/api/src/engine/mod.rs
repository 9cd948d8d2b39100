//! Run engine: fan-out, fan-in and the coordinator tying them together.
//!
//! - [`stimulus`]: one trigger per subsystem under test.
//! - [`dispatcher`]: concurrent, fail-fast issuance of every stimulus.
//! - [`aggregator`]: folds the run's verdict feed into a [`RunOutcome`].
//! - [`coordinator`]: one end-to-end run and its rendered response.
//!
//! [`RunOutcome`]: smoke_core::verdict::RunOutcome

pub mod aggregator;
pub mod coordinator;
pub mod dispatcher;
pub mod stimulus;

use std::sync::Arc;

use smoke_events::VerdictSource;

use aggregator::Aggregator;
use coordinator::{Locator, RunCoordinator};
use dispatcher::Dispatcher;

/// Long-lived factory for per-request [`RunCoordinator`]s.
pub struct RunEngine {
    dispatcher: Arc<Dispatcher>,
    aggregator: Aggregator,
    source: Arc<dyn VerdictSource>,
    locator: Locator,
}

impl RunEngine {
    pub fn new(
        dispatcher: Dispatcher,
        aggregator: Aggregator,
        source: Arc<dyn VerdictSource>,
        locator: Locator,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            aggregator,
            source,
            locator,
        }
    }

    /// A fresh coordinator with its own run id.
    pub fn coordinator(&self) -> RunCoordinator {
        RunCoordinator::new(
            Arc::clone(&self.dispatcher),
            self.aggregator.clone(),
            Arc::clone(&self.source),
            &self.locator,
        )
    }

    /// Verdicts every run waits for.
    pub fn expected_count(&self) -> usize {
        self.aggregator
            .expected_count(self.dispatcher.expected_count())
    }
}
