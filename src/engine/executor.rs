//! Execution engine
//!
//! Runs a single job through its start-time gate, retry loop, per-attempt
//! timeout, and dependency chain. All failures are caught and classified
//! here; callers always receive an [`Outcome`], never an error.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::actions::{ActionError, ActionRegistry};
use crate::domain::{ArgBag, Job, JobState};

use super::error::AttemptError;

/// Result of running a job
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The job produced a result
    Finished(Value),
    /// The job (or one of its dependencies) is gated on a start time; no
    /// usable attempt was possible yet
    Deferred,
    /// The job exhausted its attempts without a result
    Failed,
}

impl Outcome {
    /// Check if this is a successful outcome
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// The result value, for finished outcomes
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Finished(value) => Some(value),
            _ => None,
        }
    }

    /// The ledger state this outcome maps to
    pub fn state(&self) -> JobState {
        match self {
            Self::Finished(_) => JobState::Finished,
            Self::Deferred => JobState::Wait,
            Self::Failed => JobState::Fail,
        }
    }
}

/// Executes jobs against a shared action registry
pub struct Executor {
    registry: Arc<ActionRegistry>,
}

impl Executor {
    /// Create an executor over the given registry
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// Run one job to an outcome
    ///
    /// Each attempt is raced against the job's `max_working_time`. The
    /// action itself runs on its own task: when the budget elapses the
    /// attempt is abandoned, but an action that never reaches an await
    /// point keeps running detached until it completes on its own.
    pub fn run<'a>(&'a self, job: &'a Job) -> BoxFuture<'a, Outcome> {
        async move {
            debug!(action = %job.action, "Executor::run: called");

            if !job.is_runnable_at(Utc::now()) {
                debug!(action = %job.action, ?job.start_at, "Executor::run: start time not reached, deferring");
                return Outcome::Deferred;
            }

            let mut last_error: Option<AttemptError> = None;
            for attempt in 1..=job.tries {
                match self.attempt(job).await {
                    Ok(value) => {
                        debug!(action = %job.action, attempt, "Executor::run: attempt succeeded");
                        return Outcome::Finished(value);
                    }
                    Err(err) => {
                        warn!(
                            action = %job.action,
                            id = ?job.id,
                            attempt,
                            tries = job.tries,
                            %err,
                            "Attempt failed"
                        );
                        last_error = Some(err);
                    }
                }
            }

            match last_error {
                Some(err) if err.is_gating() => {
                    debug!(action = %job.action, "Executor::run: attempts exhausted on a gate, deferring");
                    Outcome::Deferred
                }
                _ => {
                    debug!(action = %job.action, "Executor::run: attempts exhausted, failing");
                    Outcome::Failed
                }
            }
        }
        .boxed()
    }

    /// One attempt, raced against the per-attempt budget
    async fn attempt(&self, job: &Job) -> Result<Value, AttemptError> {
        let work = self.attempt_inner(job);
        match job.max_working_time() {
            Some(budget) => match tokio::time::timeout(budget, work).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Timeout { budget }),
            },
            None => work.await,
        }
    }

    /// Resolve dependencies, then invoke the action with the merged kwargs
    async fn attempt_inner(&self, job: &Job) -> Result<Value, AttemptError> {
        let mut kwargs = job.kwargs.clone();
        self.resolve_dependencies(job, &mut kwargs).await?;

        let action = self
            .registry
            .get(&job.action)
            .ok_or_else(|| AttemptError::UnknownAction {
                name: job.action.clone(),
            })?;

        let args = job.args.clone();
        let handle = tokio::spawn(async move { action.execute(&args, &kwargs).await });

        match handle.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(AttemptError::Execution(err)),
            // The action panicked; classify it like any other execution error
            Err(join_err) => Err(AttemptError::Execution(ActionError::Failed(join_err.to_string()))),
        }
    }

    /// Run each dependency in declared order, injecting results under their
    /// `return_arg` names
    ///
    /// Dependencies are re-executed in full on every attempt of the parent,
    /// side effects included.
    async fn resolve_dependencies(&self, job: &Job, kwargs: &mut ArgBag) -> Result<(), AttemptError> {
        for dependency in &job.dependencies {
            debug!(action = %job.action, dependency = %dependency.action, "Executor::resolve_dependencies: running dependency");
            match self.run(dependency).await {
                Outcome::Failed => {
                    return Err(AttemptError::DependencyFailed {
                        action: dependency.action.clone(),
                    });
                }
                Outcome::Deferred => {
                    return Err(AttemptError::DependencyNotReady {
                        action: dependency.action.clone(),
                    });
                }
                Outcome::Finished(value) => {
                    if let Some(key) = &dependency.return_arg {
                        kwargs.insert(key.clone(), value);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use serde_json::json;

    use crate::actions::Action;
    use crate::actions::builtin::{AddAction, SleepAction, SubAction};

    /// Counts invocations; fails until `succeed_after` calls have happened
    struct FlakyAction {
        calls: Arc<AtomicU32>,
        succeed_after: u32,
    }

    #[async_trait]
    impl Action for FlakyAction {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn description(&self) -> &'static str {
            "Fails a configured number of times, then succeeds."
        }

        async fn execute(&self, _args: &[Value], _kwargs: &ArgBag) -> Result<Value, ActionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.succeed_after {
                return Err(ActionError::Failed(format!("flaky failure #{}", call)));
            }
            Ok(json!("OK"))
        }
    }

    /// Counts invocations and echoes the kwarg bag back as its result
    struct RecordingAction {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Action for RecordingAction {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn description(&self) -> &'static str {
            "Records invocations and returns the kwargs it saw."
        }

        async fn execute(&self, _args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::to_value(kwargs).unwrap())
        }
    }

    fn executor_with<F>(build: F) -> Executor
    where
        F: FnOnce(&mut ActionRegistry),
    {
        let mut registry = ActionRegistry::empty();
        registry.register(Arc::new(AddAction));
        registry.register(Arc::new(SubAction));
        registry.register(Arc::new(SleepAction));
        build(&mut registry);
        Executor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_simple_success() {
        let executor = executor_with(|_| {});
        let job = Job::new("sub").with_args(vec![json!(7), json!(6)]);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Finished(json!(1.0)));
    }

    #[tokio::test]
    async fn test_start_gate_defers_without_invoking() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(RecordingAction { calls: calls.clone() }));
        });
        let job = Job::new("recording").with_start_at(Utc::now() + TimeDelta::hours(1));

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Deferred);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_elapsed_start_gate_runs() {
        let executor = executor_with(|_| {});
        let job = Job::new("sub")
            .with_args(vec![json!(7), json!(6)])
            .with_start_at(Utc::now() - TimeDelta::hours(1));

        assert!(executor.run(&job).await.is_finished());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(FlakyAction {
                calls: calls.clone(),
                succeed_after: u32::MAX,
            }));
        });
        let job = Job::new("flaky").with_tries(3);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_success_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(FlakyAction {
                calls: calls.clone(),
                succeed_after: 2,
            }));
        });
        let job = Job::new("flaky").with_tries(3);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Finished(json!("OK")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(FlakyAction {
                calls: calls.clone(),
                succeed_after: 0,
            }));
        });
        let job = Job::new("flaky").with_tries(5);

        assert!(executor.run(&job).await.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dependency_result_injection() {
        let executor = executor_with(|_| {});
        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]).with_return_arg("x");
        let job = Job::new("add").with_args(vec![json!(5)]).with_dependency(dep);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Finished(json!(6.0)));
    }

    #[tokio::test]
    async fn test_dependency_value_visible_in_kwargs_at_invocation() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(RecordingAction { calls: calls.clone() }));
        });

        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]).with_return_arg("x");
        let job = Job::new("recording").with_dependency(dep);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Finished(json!({ "x": 1.0 })));
    }

    #[tokio::test]
    async fn test_dependency_without_return_arg_is_discarded() {
        let executor = executor_with(|_| {});
        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]);
        let job = Job::new("add").with_args(vec![json!(5)]).with_dependency(dep);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Finished(json!(5.0)));
    }

    #[tokio::test]
    async fn test_injection_does_not_mutate_job() {
        let executor = executor_with(|_| {});
        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]).with_return_arg("x");
        let job = Job::new("add").with_args(vec![json!(5)]).with_dependency(dep);

        executor.run(&job).await;
        assert!(!job.kwargs.contains_key("x"));
    }

    #[tokio::test]
    async fn test_failed_dependency_consumes_attempts_without_invoking_parent() {
        let parent_calls = Arc::new(AtomicU32::new(0));
        let dep_calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(RecordingAction {
                calls: parent_calls.clone(),
            }));
            r.register(Arc::new(FlakyAction {
                calls: dep_calls.clone(),
                succeed_after: u32::MAX,
            }));
        });

        let dep = Job::new("flaky");
        let job = Job::new("recording").with_tries(2).with_dependency(dep);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(parent_calls.load(Ordering::SeqCst), 0);
        // Dependencies run fresh on each parent attempt
        assert_eq!(dep_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gated_dependency_defers_parent() {
        let parent_calls = Arc::new(AtomicU32::new(0));
        let executor = executor_with(|r| {
            r.register(Arc::new(RecordingAction {
                calls: parent_calls.clone(),
            }));
        });

        let dep = Job::new("sub")
            .with_args(vec![json!(7), json!(6)])
            .with_start_at(Utc::now() + TimeDelta::hours(1));
        let job = Job::new("recording").with_dependency(dep);

        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Deferred);
        assert_eq!(parent_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_interrupts_attempt() {
        let executor = executor_with(|_| {});
        let job = Job::new("sleep")
            .with_args(vec![json!(5_000)])
            .with_max_working_time(Duration::from_millis(50));

        let started = Instant::now();
        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_timeout_consumes_one_try_per_attempt() {
        let executor = executor_with(|_| {});
        let job = Job::new("sleep")
            .with_args(vec![json!(5_000)])
            .with_max_working_time(Duration::from_millis(30))
            .with_tries(3);

        let started = Instant::now();
        let outcome = executor.run(&job).await;
        assert_eq!(outcome, Outcome::Failed);
        // Three timed-out attempts, not one and not unbounded
        assert!(started.elapsed() >= Duration::from_millis(90));
        assert!(started.elapsed() < Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let executor = executor_with(|_| {});
        let job = Job::new("no_such_action");

        assert_eq!(executor.run(&job).await, Outcome::Failed);
    }

    #[tokio::test]
    async fn test_outcome_state_mapping() {
        assert_eq!(Outcome::Finished(json!(1)).state(), JobState::Finished);
        assert_eq!(Outcome::Deferred.state(), JobState::Wait);
        assert_eq!(Outcome::Failed.state(), JobState::Fail);
    }
}
