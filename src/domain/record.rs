//! Status records - the durable per-job bookkeeping rows
//!
//! One StatusRecord per admitted job lives in the status ledger; the same
//! shape queues FIFO in the waiting file until a slot frees up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::JobId;
use super::job::Job;

/// State of an admitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Not yet run to a terminal outcome (includes start-time and
    /// dependency gating)
    #[default]
    Wait,
    /// Ran to a successful result
    Finished,
    /// Exhausted its attempts or could not be loaded
    Fail,
}

impl JobState {
    /// Check if the state is terminal - no further sweeps will run the job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Fail)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wait => write!(f, "wait"),
            Self::Finished => write!(f, "finished"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait" => Ok(Self::Wait),
            "finished" => Ok(Self::Finished),
            "fail" => Ok(Self::Fail),
            _ => Err(format!("Unknown job state: {}", s)),
        }
    }
}

/// One bookkeeping row: id, schedule time, action name, dependency ids,
/// and current state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Id of the job this row tracks
    pub id: JobId,

    /// The job's start-time gate, if any
    pub start_at: Option<DateTime<Utc>>,

    /// Action name, for human inspection of the ledger
    pub action: String,

    /// Ids of the job's direct dependencies
    pub deps: Vec<JobId>,

    /// Current state
    pub state: JobState,
}

impl StatusRecord {
    /// Create a `wait` record for a job that has just been assigned an id
    pub fn new(id: JobId, job: &Job) -> Self {
        Self {
            id,
            start_at: job.start_at,
            action: job.action.clone(),
            deps: job.dependency_ids(),
            state: JobState::Wait,
        }
    }
}
