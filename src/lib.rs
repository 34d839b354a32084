//! JobDaemon - single-node job scheduler
//!
//! Callers submit jobs with optional start-time gating, per-attempt
//! timeouts, retry counts, and inter-job data dependencies. A background
//! worker admits a bounded number of jobs, executes them sequentially once
//! per sweep, persists their status durably, and promotes queued jobs FIFO
//! as slots free up.
//!
//! # Core Concepts
//!
//! - **State in Files**: the task store, status ledger, and waiting queue
//!   survive restarts; a job is runnable from its id alone
//! - **Bounded Admission**: `pool_size` caps how many jobs hold a status
//!   record, not how many run in parallel - execution is sequential
//! - **Classified Failures**: timeouts, gated dependencies, failed
//!   dependencies, and action errors are distinguished, so "still waiting"
//!   never masquerades as "failed"
//!
//! # Modules
//!
//! - [`domain`] - jobs, ids, status records
//! - [`actions`] - named callable payloads and the registry
//! - [`engine`] - per-job execution: gate, timeout, retries, dependencies
//! - [`store`] - durable task store, status ledger, waiting queue
//! - [`scheduler`] - admission control and the sweep worker
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod actions;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use actions::{Action, ActionError, ActionRegistry};
pub use config::{Config, SchedulerSettings, StorageConfig};
pub use domain::{ArgBag, Job, JobId, JobState, StatusRecord};
pub use engine::{AttemptError, Executor, Outcome};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use store::{StatusLedger, TaskStore, WaitingQueue};
