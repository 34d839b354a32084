//! Scheduler implementation
//!
//! Owns the task store, status ledger, waiting queue, and the atomic
//! admitted counter; runs the polling sweep loop in a background worker.
//! Submitters only append; the single worker is the only writer that
//! rewrites the ledger.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use eyre::{Context, Result, eyre};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actions::ActionRegistry;
use crate::domain::{Job, JobId, JobState, StatusRecord};
use crate::engine::{Executor, Outcome};
use crate::store::{StatusLedger, TaskStore, WaitingQueue};

use super::config::SchedulerConfig;

/// State shared between the scheduler handle and its sweep worker
struct SchedulerInner {
    config: SchedulerConfig,
    registry: Arc<ActionRegistry>,
    executor: Executor,
    tasks: TaskStore,
    ledger: StatusLedger,
    waiting: WaitingQueue,
    admitted: AtomicUsize,
}

/// Handle to the running sweep worker
struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// The Scheduler admits jobs up to `pool_size`, persists them durably,
/// and executes them in ledger order once per sweep.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    worker: Option<Worker>,
}

impl Scheduler {
    /// Open the scheduler's stores and seed the admitted counter from the
    /// existing ledger, so a restart resumes where the last process left off
    pub async fn open(config: SchedulerConfig, registry: Arc<ActionRegistry>) -> Result<Self> {
        debug!(?config, "Scheduler::open: called");
        let tasks = TaskStore::open(&config.tasks_dir)?;
        let ledger = StatusLedger::new(&config.statuses_file);
        let waiting = WaitingQueue::new(&config.waiting_file);

        let admitted = ledger.len().await?;
        info!(pool_size = config.pool_size, admitted, "Opened scheduler");

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                executor: Executor::new(registry.clone()),
                registry,
                config,
                tasks,
                ledger,
                waiting,
                admitted: AtomicUsize::new(admitted),
            }),
            worker: None,
        })
    }

    /// Accept a job: assign ids through its dependency closure, persist it,
    /// and either admit it or queue it behind the pool limit
    pub async fn schedule(&self, job: Job) -> Result<JobId> {
        self.inner.schedule(job).await
    }

    /// Spawn the background sweep worker
    ///
    /// Calling this while a worker is already running is an error; a second
    /// worker is never spawned.
    pub fn start(&mut self) -> Result<()> {
        debug!("Scheduler::start: called");
        if self.worker.is_some() {
            debug!("Scheduler::start: worker already running, rejecting");
            return Err(eyre!("Scheduler worker already running"));
        }

        let inner = self.inner.clone();
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let interval = inner.config.sweep_interval();

        let handle = tokio::spawn(async move {
            info!("Sweep worker started");
            loop {
                if let Err(err) = inner.sweep().await {
                    warn!(%err, "Sweep failed");
                }
                // Stop is observed between sweeps, never mid-sweep
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }
                tokio::time::sleep(interval).await;
            }
            info!("Sweep worker stopped");
        });

        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Request graceful shutdown and wait (bounded) for the worker to
    /// finish its current sweep and exit
    pub async fn stop(&mut self) -> Result<()> {
        debug!("Scheduler::stop: called");
        let Some(mut worker) = self.worker.take() else {
            info!("Scheduler is not running");
            return Ok(());
        };

        info!("Stopping sweep worker...");
        let _ = worker.stop_tx.send(()).await;

        match tokio::time::timeout(self.inner.config.stop_timeout(), &mut worker.handle).await {
            Ok(joined) => joined.context("Sweep worker panicked")?,
            Err(_) => {
                warn!("Sweep worker did not stop in time, aborting");
                worker.handle.abort();
            }
        }

        Ok(())
    }

    /// Check whether the sweep worker is running
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Run one full sweep over the admitted jobs
    pub async fn sweep(&self) -> Result<()> {
        self.inner.sweep().await
    }

    /// Execute a single task by id, bypassing the sweep
    ///
    /// Updates only that id's ledger line: a terminal outcome removes the
    /// line and the task store entry, a deferred one leaves both in place.
    /// The admitted counter and waiting queue are untouched.
    pub async fn run_task(&self, id: &JobId) -> Result<Outcome> {
        self.inner.run_task(id).await
    }

    /// Current status ledger contents
    pub async fn statuses(&self) -> Result<Vec<StatusRecord>> {
        self.inner.ledger.load().await
    }

    /// Current waiting queue contents
    pub async fn waiting(&self) -> Result<Vec<StatusRecord>> {
        self.inner.waiting.load().await
    }

    /// Current admitted count
    pub fn admitted_count(&self) -> usize {
        self.inner.admitted.load(Ordering::SeqCst)
    }

    /// The scheduler's configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }
}

impl SchedulerInner {
    async fn schedule(&self, mut job: Job) -> Result<JobId> {
        debug!(action = %job.action, "SchedulerInner::schedule: called");
        if let Err(err) = self.validate(&job) {
            warn!(%err, action = %job.action, "Rejected job");
            return Err(err);
        }

        let id = assign_ids(&mut job);

        info!(%id, action = %job.action, "Adding task");
        self.tasks.put(&job).await?;

        let record = StatusRecord::new(id.clone(), &job);
        let pool_size = self.config.pool_size;
        let admitted = self
            .admitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < pool_size).then_some(count + 1)
            });

        match admitted {
            Ok(_) => {
                debug!(%id, "SchedulerInner::schedule: admitted");
                self.ledger.append(&record).await?;
            }
            Err(_) => {
                debug!(%id, "SchedulerInner::schedule: pool full, queueing");
                self.waiting.append(&record).await?;
            }
        }

        Ok(id)
    }

    /// Schedule-time validation over the whole dependency closure
    fn validate(&self, job: &Job) -> Result<()> {
        if job.tries < 1 {
            return Err(eyre!("Job '{}' must allow at least one try", job.action));
        }
        if !self.registry.has_action(&job.action) {
            return Err(eyre!("Unknown action: {}", job.action));
        }

        let mut return_args = HashSet::new();
        for dependency in &job.dependencies {
            if let Some(arg) = &dependency.return_arg {
                if job.kwargs.contains_key(arg) {
                    return Err(eyre!(
                        "return_arg '{}' of dependency '{}' collides with a kwarg of '{}'",
                        arg,
                        dependency.action,
                        job.action
                    ));
                }
                if !return_args.insert(arg.clone()) {
                    return Err(eyre!(
                        "Duplicate return_arg '{}' among dependencies of '{}'",
                        arg,
                        job.action
                    ));
                }
            }
            self.validate(dependency)?;
        }

        Ok(())
    }

    /// Load a job by id and run it; a missing entry is a failed lookup,
    /// never a crashed sweep
    async fn execute(&self, id: &JobId) -> Outcome {
        debug!(%id, "SchedulerInner::execute: called");
        match self.tasks.get(id).await {
            Ok(Some(job)) => self.executor.run(&job).await,
            Ok(None) => {
                error!(%id, "Task not found");
                Outcome::Failed
            }
            Err(err) => {
                error!(%id, %err, "Failed to load task");
                Outcome::Failed
            }
        }
    }

    /// One sweep: run every admitted job in ledger order, then refresh the
    /// ledger, promoting waiting jobs into freed slots
    async fn sweep(&self) -> Result<()> {
        debug!("SchedulerInner::sweep: called");
        let mut active = self.ledger.load().await?;

        for record in &mut active {
            let outcome = self.execute(&record.id).await;
            record.state = outcome.state();
            match record.state {
                JobState::Finished => info!(id = %record.id, "Task successfully completed"),
                JobState::Fail => warn!(id = %record.id, "Task completed with an error"),
                JobState::Wait => debug!(id = %record.id, "Task is still waiting"),
            }
        }

        self.refresh_statuses(active).await
    }

    /// Merge the swept states with any records admitted mid-sweep, drop
    /// terminal records (promoting from the waiting queue or freeing the
    /// slot), and rewrite the ledger
    async fn refresh_statuses(&self, swept: Vec<StatusRecord>) -> Result<()> {
        debug!(count = swept.len(), "SchedulerInner::refresh_statuses: called");
        self.ledger
            .rewrite(|current| async move {
                let known: HashSet<JobId> = swept.iter().map(|record| record.id.clone()).collect();
                let mut merged = swept;
                merged.extend(current.into_iter().filter(|record| !known.contains(&record.id)));

                let mut keep = Vec::with_capacity(merged.len());
                for record in merged {
                    if !record.state.is_terminal() {
                        keep.push(record);
                        continue;
                    }

                    match self.waiting.pop_front().await? {
                        Some(promoted) => {
                            info!(id = %promoted.id, "Promoting task from waiting queue");
                            keep.push(promoted);
                        }
                        None => {
                            let _ = self
                                .admitted
                                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                                    Some(count.saturating_sub(1))
                                });
                        }
                    }

                    if !self.tasks.delete(&record.id).await? {
                        error!(id = %record.id, "Cannot find task entry for deletion");
                    }
                }

                Ok(keep)
            })
            .await
    }

    async fn run_task(&self, id: &JobId) -> Result<Outcome> {
        info!(%id, "Single task execution");
        let outcome = self.execute(id).await;

        if outcome.state().is_terminal() {
            self.ledger
                .rewrite(|records| async move { Ok(records.into_iter().filter(|r| r.id != *id).collect()) })
                .await?;
            if !self.tasks.delete(id).await? {
                debug!(%id, "SchedulerInner::run_task: no task entry to delete");
            }
        }

        Ok(outcome)
    }
}

/// Assign fresh ids through a job's dependency closure
fn assign_ids(job: &mut Job) -> JobId {
    let id = JobId::new();
    job.id = Some(id.clone());
    for dependency in &mut job.dependencies {
        assign_ids(dependency);
    }
    id
}
