//! Compensation log for one saga execution.
//!
//! Each fatal step that can leave state behind registers a compensation
//! once its forward action succeeds. On failure the log is replayed in
//! reverse completion order; on success it is dropped unexecuted.

use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::error::{CompensationFailure, StepError};

/// A pending compensation. Futures are lazy, so nothing runs until the log
/// is unwound.
pub type Compensation<'a> = BoxFuture<'a, Result<(), StepError>>;

/// Ordered record of compensations for completed steps.
#[derive(Default)]
pub struct CompensationLog<'a> {
    entries: Vec<(&'static str, Compensation<'a>)>,
}

impl<'a> CompensationLog<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the compensation for a step that just completed.
    pub fn register(&mut self, step: &'static str, compensation: Compensation<'a>) {
        self.entries.push((step, compensation));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the steps with a registered compensation, in completion
    /// order.
    pub fn steps(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(step, _)| *step).collect()
    }

    /// Runs every compensation exactly once, newest first.
    ///
    /// A failing compensation does not stop the unwind; it is logged,
    /// counted and returned.
    pub async fn unwind(self, timeout: Option<Duration>) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for (step, compensation) in self.entries.into_iter().rev() {
            metrics::counter!("saga_compensations_total", "step" => step).increment(1);
            tracing::info!(step, "compensation started");

            match bounded(timeout, compensation).await {
                Ok(()) => tracing::info!(step, "compensation completed"),
                Err(e) => {
                    metrics::counter!("saga_compensation_failures_total", "step" => step)
                        .increment(1);
                    tracing::error!(step, error = %e, "compensation failed");
                    failures.push(CompensationFailure {
                        step,
                        reason: e.to_string(),
                    });
                }
            }
        }

        failures
    }

    /// Drops every pending compensation without running it. Returns how
    /// many were discarded.
    pub fn discard(self) -> usize {
        self.entries.len()
    }
}

/// Awaits `fut`, giving up after `timeout` when one is set.
pub(crate) async fn bounded<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, StepError>
where
    F: Future<Output = Result<T, StepError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StepError::TimedOut(limit))?,
        None => fut.await,
    }
}
