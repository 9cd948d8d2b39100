//! Lifecycle of a single coordinated run.
//!
//! ```text
//! Created -> Dispatching -> Aggregating -> Passed
//!                 |              |
//!                 +--------------+-------> Failed
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    Dispatching,
    Aggregating,
    Passed,
    Failed,
}

impl RunState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Created, Dispatching)
                | (Dispatching, Aggregating)
                | (Dispatching, Failed)
                | (Aggregating, Passed)
                | (Aggregating, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(RunState::Created.can_transition_to(RunState::Dispatching));
        assert!(RunState::Dispatching.can_transition_to(RunState::Aggregating));
        assert!(RunState::Aggregating.can_transition_to(RunState::Passed));
    }

    #[test]
    fn dispatch_can_fail_without_aggregating() {
        assert!(RunState::Dispatching.can_transition_to(RunState::Failed));
        assert!(!RunState::Dispatching.can_transition_to(RunState::Passed));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [RunState::Passed, RunState::Failed] {
            for next in [
                RunState::Created,
                RunState::Dispatching,
                RunState::Aggregating,
                RunState::Passed,
                RunState::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn states_cannot_be_skipped() {
        assert!(!RunState::Created.can_transition_to(RunState::Aggregating));
        assert!(!RunState::Created.can_transition_to(RunState::Failed));
    }
}
