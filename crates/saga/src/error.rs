//! Saga error types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::ValidationError;
use resource_store::StoreError;
use thiserror::Error;

use crate::services::{DeliveryError, IdentityError};
use crate::state::SagaState;

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum StepError {
    /// The store rejected the step's call.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A role the step depends on is missing.
    #[error("Role {0} not found")]
    RoleNotFound(String),

    /// The identity provider refused to create the account.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The invitation could not be handed to the sender.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The step did not finish within the configured limit.
    #[error("step timed out after {0:?}")]
    TimedOut(Duration),
}

impl StepError {
    /// Returns the underlying store error, if the step failed in the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            StepError::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// A compensation that failed during unwind. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub step: &'static str,
    pub reason: String,
}

/// Errors returned by the saga entry points.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Caller input was missing or malformed. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An invitation was requested for an email that already has a profile.
    #[error("User with this email already exists")]
    EmailAlreadyRegistered { email: String },

    /// A role required before any write is missing.
    #[error("Role {role} not found")]
    RoleNotFound { role: String },

    /// No pending invitation exists for the email.
    #[error("Invitation not found")]
    InvitationNotFound { email: String },

    /// The pending invitation for the email is past its deadline.
    #[error("Invitation has expired")]
    InvitationExpired {
        email: String,
        expired_at: DateTime<Utc>,
    },

    /// A fatal step failed; earlier steps were compensated.
    #[error("{}", step_failed_message(.step, .source, .compensation_failures))]
    StepFailed {
        step: &'static str,
        #[source]
        source: StepError,
        compensation_failures: Vec<CompensationFailure>,
    },

    /// A step failure that maps to a known caller mistake.
    #[error("{message}")]
    Rejected {
        message: &'static str,
        #[source]
        cause: Box<SagaError>,
    },

    /// The writes persisted but reading the result back failed.
    #[error("{step} succeeded but reading the result back failed: {source}")]
    ReadAfterWrite {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// An execution was driven from the wrong state.
    #[error("Invalid saga state: expected {expected}, actual {actual}")]
    InvalidState {
        expected: SagaState,
        actual: SagaState,
    },

    /// A store call outside any step failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SagaError {
    /// The store error behind a failed step, if any.
    pub fn step_store_error(&self) -> Option<&StoreError> {
        match self {
            SagaError::StepFailed { source, .. } => source.store_error(),
            _ => None,
        }
    }

    /// Compensations that failed while unwinding, if this is a step failure.
    pub fn compensation_failures(&self) -> &[CompensationFailure] {
        match self {
            SagaError::StepFailed {
                compensation_failures,
                ..
            } => compensation_failures,
            SagaError::Rejected { cause, .. } => cause.compensation_failures(),
            _ => &[],
        }
    }
}

fn step_failed_message(
    step: &str,
    source: &StepError,
    compensation_failures: &[CompensationFailure],
) -> String {
    if compensation_failures.is_empty() {
        return format!("{step} failed: {source}");
    }
    let failed = compensation_failures
        .iter()
        .map(|f| format!("{} ({})", f.step, f.reason))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{step} failed: {source}; compensation also failed for {failed}")
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use resource_store::{Collection, Operation};

    use super::*;

    fn unavailable() -> StoreError {
        StoreError::Unavailable {
            collection: Collection::Units,
            operation: Operation::Insert,
            reason: "injected failure".to_string(),
        }
    }

    #[test]
    fn step_failure_names_step_and_cause() {
        let err = SagaError::StepFailed {
            step: "create_units",
            source: StepError::Store(unavailable()),
            compensation_failures: vec![],
        };

        assert_eq!(
            err.to_string(),
            "create_units failed: insert on units failed: injected failure"
        );
        assert!(err.step_store_error().is_some());
    }

    #[test]
    fn step_failure_lists_failed_compensations() {
        let err = SagaError::StepFailed {
            step: "create_units",
            source: StepError::TimedOut(Duration::from_secs(1)),
            compensation_failures: vec![CompensationFailure {
                step: "create_property",
                reason: "connection reset".to_string(),
            }],
        };

        assert!(
            err.to_string()
                .ends_with("compensation also failed for create_property (connection reset)")
        );
        assert_eq!(err.compensation_failures().len(), 1);
    }
}
