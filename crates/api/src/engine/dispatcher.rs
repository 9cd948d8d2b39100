//! Trigger fan-out.
//!
//! [`Dispatcher::dispatch`] issues every registered [`Stimulus`] concurrently
//! and resolves once all of them have been accepted. The first rejection
//! fails the whole fan-out; issuances still in flight are dropped.

use std::sync::Arc;

use futures::future::try_join_all;
use smoke_core::types::RunId;
use smoke_platform::PlatformError;

use super::stimulus::Stimulus;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A dispatcher must fan out to at least one subsystem.
    #[error("No stimuli registered")]
    NoStimuli,

    #[error("Stimulus '{stimulus}' failed: {source}")]
    Issue {
        stimulus: String,
        #[source]
        source: PlatformError,
    },
}

/// Fixed set of stimuli, fanned out once per run.
pub struct Dispatcher {
    stimuli: Vec<Arc<dyn Stimulus>>,
}

impl Dispatcher {
    pub fn new(stimuli: Vec<Arc<dyn Stimulus>>) -> Result<Self, DispatchError> {
        if stimuli.is_empty() {
            return Err(DispatchError::NoStimuli);
        }
        Ok(Self { stimuli })
    }

    /// Number of verdicts a run must collect: one per registered stimulus.
    pub fn expected_count(&self) -> usize {
        self.stimuli.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stimuli.iter().map(|s| s.name()).collect()
    }

    /// Issue every stimulus for `run_id`.
    pub async fn dispatch(&self, run_id: RunId) -> Result<(), DispatchError> {
        let issuances = self.stimuli.iter().map(|stimulus| async move {
            match stimulus.issue(run_id).await {
                Ok(()) => {
                    tracing::debug!(run_id = %run_id, stimulus = stimulus.name(), "Stimulus accepted");
                    Ok(())
                }
                Err(source) => {
                    tracing::error!(
                        run_id = %run_id,
                        stimulus = stimulus.name(),
                        error = %source,
                        "Stimulus rejected"
                    );
                    Err(DispatchError::Issue {
                        stimulus: stimulus.name().to_string(),
                        source,
                    })
                }
            }
        });

        try_join_all(issuances).await?;
        tracing::info!(run_id = %run_id, count = self.stimuli.len(), "All stimuli accepted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
