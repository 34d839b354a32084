//! StatusLedger - the ordered, durable record of admitted jobs
//!
//! One JSONL line per admitted job. `schedule` appends; only the sweep
//! worker rewrites. Every file operation runs under one async mutex, the
//! single-writer lock around the rewrite step.

use std::future::Future;
use std::path::PathBuf;

use eyre::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::StatusRecord;

/// Append/rewrite JSONL file of status records
pub struct StatusLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StatusLedger {
    /// Create a ledger backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "StatusLedger::new: called");
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Append one record
    pub async fn append(&self, record: &StatusRecord) -> Result<()> {
        debug!(id = %record.id, state = %record.state, "StatusLedger::append: called");
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
            .context("Failed to open status ledger")?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Load all records, in ledger order
    pub async fn load(&self) -> Result<Vec<StatusRecord>> {
        debug!(path = ?self.path, "StatusLedger::load: called");
        let _guard = self.lock.lock().await;
        self.read_records().await
    }

    /// Replace the whole ledger with the given records
    pub async fn replace(&self, records: &[StatusRecord]) -> Result<()> {
        debug!(count = records.len(), "StatusLedger::replace: called");
        let _guard = self.lock.lock().await;
        self.write_records(records).await
    }

    /// Load, transform, and rewrite in one locked step
    ///
    /// The lock is held across the transform, so appends from submitters
    /// cannot land between the read and the rewrite and be lost.
    pub async fn rewrite<F, Fut>(&self, transform: F) -> Result<()>
    where
        F: FnOnce(Vec<StatusRecord>) -> Fut,
        Fut: Future<Output = Result<Vec<StatusRecord>>>,
    {
        debug!("StatusLedger::rewrite: called");
        let _guard = self.lock.lock().await;
        let records = self.read_records().await?;
        let records = transform(records).await?;
        self.write_records(&records).await
    }

    /// Number of records
    pub async fn len(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }

    /// Check whether the ledger has no records
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn read_records(&self) -> Result<Vec<StatusRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read status ledger")?;

        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<StatusRecord>, _>>()
            .context("Failed to parse status ledger")?;

        Ok(records)
    }

    async fn write_records(&self, records: &[StatusRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).await.context("Failed to write status ledger")?;
        fs::rename(&tmp, &self.path)
            .await
            .context("Failed to commit status ledger")?;

        Ok(())
    }
}
