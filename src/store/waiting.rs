//! WaitingQueue - FIFO overflow store for jobs scheduled at capacity
//!
//! Same record shape as the status ledger; consumed oldest-first as
//! admitted slots free up.

use std::path::PathBuf;

use eyre::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::StatusRecord;

/// JSONL-backed FIFO of waiting records
pub struct WaitingQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl WaitingQueue {
    /// Create a queue backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "WaitingQueue::new: called");
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Append a record at the back of the queue
    pub async fn append(&self, record: &StatusRecord) -> Result<()> {
        debug!(id = %record.id, "WaitingQueue::append: called");
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let line = serde_json::to_string(record)? + "\n";
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("Failed to open waiting queue")?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Take the oldest record off the queue, if any
    pub async fn pop_front(&self) -> Result<Option<StatusRecord>> {
        debug!("WaitingQueue::pop_front: called");
        let _guard = self.lock.lock().await;

        let mut records = self.read_records().await?;
        if records.is_empty() {
            debug!("WaitingQueue::pop_front: queue is empty");
            return Ok(None);
        }

        let front = records.remove(0);
        self.write_records(&records).await?;

        debug!(id = %front.id, "WaitingQueue::pop_front: popped");
        Ok(Some(front))
    }

    /// Load all queued records, oldest first
    pub async fn load(&self) -> Result<Vec<StatusRecord>> {
        debug!("WaitingQueue::load: called");
        let _guard = self.lock.lock().await;
        self.read_records().await
    }

    /// Number of queued records
    pub async fn len(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }

    /// Check whether the queue is empty
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn read_records(&self) -> Result<Vec<StatusRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read waiting queue")?;

        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<StatusRecord>, _>>()
            .context("Failed to parse waiting queue")?;

        Ok(records)
    }

    async fn write_records(&self, records: &[StatusRecord]) -> Result<()> {
        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).await.context("Failed to write waiting queue")?;
        fs::rename(&tmp, &self.path)
            .await
            .context("Failed to commit waiting queue")?;

        Ok(())
    }
}
