//! TaskStore - durable home of runnable job closures
//!
//! Each accepted job is serialized (dependencies inline) to
//! `<root>/<id>.json`, so the worker can reload a fully runnable closure
//! by id alone, decoupled from the submitting process's memory.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use tracing::debug;

use crate::domain::{Job, JobId};

/// One JSON file per accepted job, keyed by id
pub struct TaskStore {
    root: PathBuf,
}

impl TaskStore {
    /// Open or create a task store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root).context("Failed to create task store directory")?;
        debug!(?root, "Opened task store");
        Ok(Self { root })
    }

    fn entry_path(&self, id: &JobId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    /// Persist a job (and its dependency closure) under its id
    ///
    /// Writes go through a temp file and rename so a crash mid-write never
    /// leaves a truncated entry.
    pub async fn put(&self, job: &Job) -> Result<()> {
        let id = job.id.as_ref().ok_or_else(|| eyre!("Cannot store a job without an id"))?;
        debug!(%id, action = %job.action, "TaskStore::put: called");

        let path = self.entry_path(id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(job).context("Failed to serialize job")?;

        tokio::fs::write(&tmp, content)
            .await
            .context("Failed to write task entry")?;
        tokio::fs::rename(&tmp, &path)
            .await
            .context("Failed to commit task entry")?;

        Ok(())
    }

    /// Load a job by id
    pub async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        debug!(%id, "TaskStore::get: called");
        let path = self.entry_path(id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(%id, "TaskStore::get: entry does not exist");
                return Ok(None);
            }
            Err(err) => return Err(err).context("Failed to read task entry"),
        };

        let job = serde_json::from_str(&content).context("Failed to parse task entry")?;
        Ok(Some(job))
    }

    /// Delete a job's entry; returns whether one existed
    pub async fn delete(&self, id: &JobId) -> Result<bool> {
        debug!(%id, "TaskStore::delete: called");
        match tokio::fs::remove_file(self.entry_path(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).context("Failed to delete task entry"),
        }
    }

    /// List the ids of all stored jobs
    pub async fn ids(&self) -> Result<Vec<JobId>> {
        debug!("TaskStore::ids: called");
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .context("Failed to read task store directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(stem) = Path::new(&name).file_stem().and_then(|s| s.to_str()) {
                if name.to_string_lossy().ends_with(".json") {
                    ids.push(JobId::from(stem));
                }
            }
        }

        Ok(ids)
    }

    /// Number of stored jobs
    pub async fn count(&self) -> Result<usize> {
        Ok(self.ids().await?.len())
    }
}
