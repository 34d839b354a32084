//! Job - the schedulable unit of work
//!
//! A Job names a registered action, carries its inputs, and declares the
//! timing, retry, and dependency policy the execution engine enforces. It
//! knows nothing about the scheduler that admits it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::JobId;

/// Named inputs to an action, also the carrier for injected dependency
/// results.
pub type ArgBag = HashMap<String, Value>;

/// A single schedulable unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier, unset until the scheduler accepts the job
    #[serde(default)]
    pub id: Option<JobId>,

    /// Registry name of the action to invoke
    pub action: String,

    /// Positional inputs to the action
    #[serde(default)]
    pub args: Vec<Value>,

    /// Named inputs to the action
    #[serde(default)]
    pub kwargs: ArgBag,

    /// The job is not runnable before this instant
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,

    /// Per-attempt wall-clock budget in milliseconds
    #[serde(default)]
    pub max_working_time_ms: Option<u64>,

    /// Maximum execution attempts (>= 1)
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Jobs that must each finish before the action runs, in order
    #[serde(default)]
    pub dependencies: Vec<Job>,

    /// Kwarg name under which this job's result is exposed to its parent
    #[serde(default)]
    pub return_arg: Option<String>,
}

fn default_tries() -> u32 {
    1
}

impl Job {
    /// Create a new Job for a named action
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            id: None,
            action: action.into(),
            args: Vec::new(),
            kwargs: ArgBag::new(),
            start_at: None,
            max_working_time_ms: None,
            tries: 1,
            dependencies: Vec::new(),
            return_arg: None,
        }
    }

    /// Set the positional inputs
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Set the named inputs
    pub fn with_kwargs(mut self, kwargs: ArgBag) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Set a single named input
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Gate execution until the given instant
    pub fn with_start_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self
    }

    /// Set the per-attempt wall-clock budget
    pub fn with_max_working_time(mut self, budget: Duration) -> Self {
        self.max_working_time_ms = Some(budget.as_millis() as u64);
        self
    }

    /// Set the maximum number of attempts
    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries;
        self
    }

    /// Add a dependency job
    pub fn with_dependency(mut self, dependency: Job) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Set the dependency list
    pub fn with_dependencies(mut self, dependencies: Vec<Job>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Expose this job's result to its parent under the given kwarg name
    pub fn with_return_arg(mut self, name: impl Into<String>) -> Self {
        self.return_arg = Some(name.into());
        self
    }

    /// Per-attempt budget as a Duration, if one is set and positive
    pub fn max_working_time(&self) -> Option<Duration> {
        self.max_working_time_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Check whether the start-time gate has elapsed
    pub fn is_runnable_at(&self, now: DateTime<Utc>) -> bool {
        match self.start_at {
            Some(start_at) => now >= start_at,
            None => true,
        }
    }

    /// Ids of the direct dependencies, for jobs already accepted by the
    /// scheduler
    pub fn dependency_ids(&self) -> Vec<JobId> {
        self.dependencies.iter().filter_map(|d| d.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    #[test]
    fn test_job_new_defaults() {
        let job = Job::new("add");
        assert!(job.id.is_none());
        assert_eq!(job.action, "add");
        assert!(job.args.is_empty());
        assert!(job.kwargs.is_empty());
        assert!(job.start_at.is_none());
        assert_eq!(job.tries, 1);
        assert!(job.dependencies.is_empty());
        assert!(job.return_arg.is_none());
    }

    #[test]
    fn test_job_builder() {
        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]).with_return_arg("x");
        let job = Job::new("add")
            .with_args(vec![json!(5)])
            .with_kwarg("y", json!(2))
            .with_tries(3)
            .with_max_working_time(Duration::from_secs(2))
            .with_dependency(dep);

        assert_eq!(job.tries, 3);
        assert_eq!(job.max_working_time(), Some(Duration::from_secs(2)));
        assert_eq!(job.dependencies.len(), 1);
        assert_eq!(job.dependencies[0].return_arg.as_deref(), Some("x"));
        assert_eq!(job.kwargs.get("y"), Some(&json!(2)));
    }

    #[test]
    fn test_max_working_time_zero_is_unset() {
        let mut job = Job::new("add");
        job.max_working_time_ms = Some(0);
        assert_eq!(job.max_working_time(), None);
    }

    #[test]
    fn test_is_runnable_at() {
        let now = Utc::now();
        let future = now + TimeDelta::hours(1);
        let past = now - TimeDelta::hours(1);

        assert!(Job::new("add").is_runnable_at(now));
        assert!(Job::new("add").with_start_at(past).is_runnable_at(now));
        assert!(!Job::new("add").with_start_at(future).is_runnable_at(now));
    }

    #[test]
    fn test_dependency_ids_skips_unassigned() {
        let mut assigned = Job::new("sub");
        assigned.id = Some(JobId::from("0193e8a0-0000-7000-8000-000000000000"));
        let unassigned = Job::new("sub");

        let job = Job::new("add").with_dependencies(vec![assigned, unassigned]);
        assert_eq!(job.dependency_ids().len(), 1);
    }

    #[test]
    fn test_job_serde_roundtrip() {
        let dep = Job::new("sub").with_args(vec![json!(7), json!(6)]).with_return_arg("x");
        let job = Job::new("add")
            .with_args(vec![json!(5)])
            .with_tries(3)
            .with_dependency(dep);

        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();

        assert_eq!(back.action, "add");
        assert_eq!(back.tries, 3);
        assert_eq!(back.dependencies.len(), 1);
        assert_eq!(back.dependencies[0].return_arg.as_deref(), Some("x"));
    }

    #[test]
    fn test_job_deserialize_minimal() {
        let back: Job = serde_json::from_str(r#"{"action":"add"}"#).unwrap();
        assert_eq!(back.tries, 1);
        assert!(back.id.is_none());
        assert!(back.dependencies.is_empty());
    }
}
