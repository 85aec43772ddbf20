//! Step executor.
//!
//! A [`SagaExecution`] runs steps strictly in order. Two step kinds exist:
//! - [`Step`]: fatal. Its failure unwinds the compensation log and ends the
//!   execution with [`SagaError::StepFailed`].
//! - [`NonFatalStep`]: best-effort. Its failure is logged and counted, and
//!   the execution carries on.
//!
//! No step is retried.

use std::future::Future;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;

use crate::compensation::{Compensation, CompensationLog, bounded};
use crate::config::SagaConfig;
use crate::error::{SagaError, StepError};
use crate::state::SagaState;

type CompensationFactory<'a, T> = Box<dyn FnOnce(&T) -> Compensation<'a> + Send + 'a>;

/// A fatal step with an optional compensation.
pub struct Step<'a, T> {
    name: &'static str,
    forward: BoxFuture<'a, Result<T, StepError>>,
    compensate: Option<CompensationFactory<'a, T>>,
}

impl<'a, T: Send + 'a> Step<'a, T> {
    pub fn new<F, E>(name: &'static str, forward: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
        E: Into<StepError>,
    {
        Self {
            name,
            forward: Box::pin(async move { forward.await.map_err(Into::into) }),
            compensate: None,
        }
    }

    /// Sets the compensation. It is built from the step's output once the
    /// forward action succeeds and runs only if a later fatal step fails.
    pub fn compensate_with<C>(mut self, compensate: C) -> Self
    where
        C: FnOnce(&T) -> Compensation<'a> + Send + 'a,
    {
        self.compensate = Some(Box::new(compensate));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A best-effort step. Failures never surface to the caller.
pub struct NonFatalStep<'a, T> {
    name: &'static str,
    forward: BoxFuture<'a, Result<T, StepError>>,
}

impl<'a, T: Send + 'a> NonFatalStep<'a, T> {
    pub fn new<F, E>(name: &'static str, forward: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
        E: Into<StepError>,
    {
        Self {
            name,
            forward: Box::pin(async move { forward.await.map_err(Into::into) }),
        }
    }
}

/// One in-flight saga.
pub struct SagaExecution<'a> {
    saga: &'static str,
    state: SagaState,
    step_timeout: Option<Duration>,
    log: CompensationLog<'a>,
    completed: Vec<&'static str>,
    started: Instant,
}

impl<'a> SagaExecution<'a> {
    /// Starts an execution of the named saga.
    pub fn start(saga: &'static str, config: &SagaConfig) -> Self {
        metrics::counter!("saga_executions_total", "saga" => saga).increment(1);
        tracing::info!(saga, "saga started");

        Self {
            saga,
            state: SagaState::Running,
            step_timeout: config.step_timeout,
            log: CompensationLog::new(),
            completed: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Steps that completed, fatal and best-effort alike, in order.
    pub fn completed_steps(&self) -> &[&'static str] {
        &self.completed
    }

    /// Runs a fatal step.
    ///
    /// On failure every compensation registered so far runs in reverse
    /// order and the execution ends in [`SagaState::Failed`].
    pub async fn execute<T: Send + 'a>(&mut self, step: Step<'a, T>) -> Result<T, SagaError> {
        self.ensure_running()?;
        let Step {
            name,
            forward,
            compensate,
        } = step;
        tracing::info!(saga = self.saga, step = name, "saga step started");

        match bounded(self.step_timeout, forward).await {
            Ok(output) => {
                if let Some(compensate) = compensate {
                    self.log.register(name, compensate(&output));
                }
                self.completed.push(name);
                tracing::info!(saga = self.saga, step = name, "saga step completed");
                Ok(output)
            }
            Err(source) => Err(self.abort(name, source).await),
        }
    }

    /// Runs a best-effort step. Returns `None` if it failed.
    pub async fn attempt<T: Send + 'a>(&mut self, step: NonFatalStep<'a, T>) -> Option<T> {
        if !self.state.can_execute() {
            return None;
        }
        let NonFatalStep { name, forward } = step;

        match bounded(self.step_timeout, forward).await {
            Ok(output) => {
                self.completed.push(name);
                tracing::info!(saga = self.saga, step = name, "best-effort step completed");
                Some(output)
            }
            Err(e) => {
                metrics::counter!("saga_best_effort_failures_total", "step" => name).increment(1);
                tracing::warn!(
                    saga = self.saga,
                    step = name,
                    error = %e,
                    "best-effort step failed, continuing"
                );
                None
            }
        }
    }

    /// Fails the execution at `step` with `source`, unwinding every
    /// registered compensation. Used by [`Self::execute`] and by callers
    /// that detect a failure outside a step.
    pub async fn abort(&mut self, step: &'static str, source: StepError) -> SagaError {
        tracing::warn!(saga = self.saga, step, error = %source, "saga step failed");
        self.state = SagaState::Compensating;

        let log = std::mem::take(&mut self.log);
        let compensation_failures = log.unwind(self.step_timeout).await;

        self.state = SagaState::Failed;
        self.record_outcome("saga_failed_total");
        tracing::warn!(
            saga = self.saga,
            step,
            compensation_failures = compensation_failures.len(),
            "saga failed"
        );

        SagaError::StepFailed {
            step,
            source,
            compensation_failures,
        }
    }

    /// Completes the execution, discarding the compensation log.
    pub fn finish(mut self) -> Result<(), SagaError> {
        self.ensure_running()?;
        let discarded = std::mem::take(&mut self.log).discard();

        self.state = SagaState::Completed;
        self.record_outcome("saga_completed_total");
        tracing::info!(
            saga = self.saga,
            steps = self.completed.len(),
            discarded,
            "saga completed"
        );
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), SagaError> {
        if self.state.can_execute() {
            Ok(())
        } else {
            Err(SagaError::InvalidState {
                expected: SagaState::Running,
                actual: self.state,
            })
        }
    }

    fn record_outcome(&self, counter: &'static str) {
        metrics::counter!(counter, "saga" => self.saga).increment(1);
        metrics::histogram!("saga_duration_seconds", "saga" => self.saga)
            .record(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use resource_store::{Collection, Operation, StoreError};

    use super::*;

    fn unavailable(collection: Collection) -> StoreError {
        StoreError::Unavailable {
            collection,
            operation: Operation::Insert,
            reason: "injected failure".to_string(),
        }
    }

    fn config() -> SagaConfig {
        SagaConfig::default().with_step_timeout(Some(Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn completed_steps_compensate_in_reverse_on_failure() {
        let undone = Arc::new(Mutex::new(Vec::new()));
        let config = config();
        let mut saga = SagaExecution::start("test", &config);

        for name in ["one", "two"] {
            let undone = Arc::clone(&undone);
            saga.execute(
                Step::new(name, async move { Ok::<_, StepError>(name) }).compensate_with(
                    move |out: &&'static str| {
                        let out = *out;
                        Box::pin(async move {
                            undone.lock().unwrap().push(out);
                            Ok(())
                        })
                    },
                ),
            )
            .await
            .unwrap();
        }

        let err = saga
            .execute(Step::new("three", async {
                Err::<(), _>(unavailable(Collection::Units))
            }))
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::StepFailed { step: "three", .. }));
        assert_eq!(*undone.lock().unwrap(), vec!["two", "one"]);
        assert_eq!(saga.state(), SagaState::Failed);
        assert_eq!(saga.completed_steps(), &["one", "two"]);
    }

    #[tokio::test]
    async fn first_step_failure_needs_no_compensation() {
        let config = config();
        let mut saga = SagaExecution::start("test", &config);

        let err = saga
            .execute(Step::new("only", async {
                Err::<(), _>(unavailable(Collection::Organizations))
            }))
            .await
            .unwrap_err();

        assert!(err.compensation_failures().is_empty());
        assert_eq!(saga.state(), SagaState::Failed);
    }

    #[tokio::test]
    async fn failed_execution_rejects_further_steps() {
        let config = config();
        let mut saga = SagaExecution::start("test", &config);
        let _ = saga
            .execute(Step::new("boom", async {
                Err::<(), _>(unavailable(Collection::Units))
            }))
            .await;

        let err = saga
            .execute(Step::new("after", async { Ok::<_, StepError>(()) }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SagaError::InvalidState {
                actual: SagaState::Failed,
                ..
            }
        ));
        assert!(saga.finish().is_err());
    }

    #[tokio::test]
    async fn non_fatal_failure_keeps_running() {
        let config = config();
        let mut saga = SagaExecution::start("test", &config);

        let skipped = saga
            .attempt(NonFatalStep::new("side_effect", async {
                Err::<(), _>(unavailable(Collection::RoleAssignments))
            }))
            .await;
        let value = saga
            .attempt(NonFatalStep::new("lookup", async { Ok::<_, StepError>(7) }))
            .await;

        assert_eq!(skipped, None);
        assert_eq!(value, Some(7));
        assert_eq!(saga.state(), SagaState::Running);
        assert!(saga.finish().is_ok());
    }

    #[tokio::test]
    async fn success_discards_compensations() {
        let undone = Arc::new(Mutex::new(0));
        let config = config();
        let mut saga = SagaExecution::start("test", &config);
        let counter = Arc::clone(&undone);

        saga.execute(
            Step::new("create", async { Ok::<_, StepError>(()) }).compensate_with(move |_| {
                Box::pin(async move {
                    *counter.lock().unwrap() += 1;
                    Ok(())
                })
            }),
        )
        .await
        .unwrap();
        saga.finish().unwrap();

        assert_eq!(*undone.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_step_times_out_and_unwinds() {
        let undone = Arc::new(Mutex::new(false));
        let config = config();
        let mut saga = SagaExecution::start("test", &config);
        let flag = Arc::clone(&undone);

        saga.execute(
            Step::new("create", async { Ok::<_, StepError>(()) }).compensate_with(move |_| {
                Box::pin(async move {
                    *flag.lock().unwrap() = true;
                    Ok(())
                })
            }),
        )
        .await
        .unwrap();

        let err = saga
            .execute(Step::new(
                "hang",
                futures_util::future::pending::<Result<(), StepError>>(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SagaError::StepFailed {
                source: StepError::TimedOut(_),
                ..
            }
        ));
        assert!(*undone.lock().unwrap());
    }
}
