//! Saga execution state machine.

use serde::{Deserialize, Serialize};

/// The state of one saga execution.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           └──► Compensating ──► Failed
/// ```
///
/// An execution starts in `Running`; there is no persisted saga, so
/// nothing observes a not-yet-started one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Steps are being executed.
    #[default]
    Running,

    /// A fatal step failed and compensations are running.
    Compensating,

    /// All fatal steps succeeded (terminal state).
    Completed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if further steps may run.
    pub fn can_execute(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns true if the execution can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
