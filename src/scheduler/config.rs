//! Scheduler configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;

/// Runtime configuration for the scheduler and its stores
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Admission capacity: how many jobs may hold a status record at once
    pub pool_size: usize,

    /// Pause between sweeps, rate-limiting the polling loop (ms)
    pub sweep_interval_ms: u64,

    /// How long `stop` waits for the worker before aborting it (ms)
    pub stop_timeout_ms: u64,

    /// Directory of task store entries
    pub tasks_dir: PathBuf,

    /// Status ledger file
    pub statuses_file: PathBuf,

    /// Waiting queue file
    pub waiting_file: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("jobdaemon"))
            .unwrap_or_else(|| PathBuf::from(".jobdaemon"));
        Self::with_data_dir(&data_dir)
    }
}

impl SchedulerConfig {
    /// Place all three stores under one data directory
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            pool_size: 10,
            sweep_interval_ms: 50,
            stop_timeout_ms: 10_000,
            tasks_dir: data_dir.join("tasks"),
            statuses_file: data_dir.join("statuses.jsonl"),
            waiting_file: data_dir.join("waiting.jsonl"),
        }
    }

    /// Build from the loaded application config
    pub fn from_config(config: &Config) -> Self {
        let mut scheduler_config = Self::with_data_dir(&config.storage.data_dir);
        scheduler_config.pool_size = config.scheduler.pool_size;
        scheduler_config.sweep_interval_ms = config.scheduler.sweep_interval_ms;
        scheduler_config.stop_timeout_ms = config.scheduler.stop_timeout_ms;
        scheduler_config
    }

    /// Sweep pause as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Stop deadline as a Duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.sweep_interval(), Duration::from_millis(50));
        assert_eq!(config.stop_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_with_data_dir_places_stores_together() {
        let config = SchedulerConfig::with_data_dir("/tmp/jd-test");
        assert_eq!(config.tasks_dir, PathBuf::from("/tmp/jd-test/tasks"));
        assert_eq!(config.statuses_file, PathBuf::from("/tmp/jd-test/statuses.jsonl"));
        assert_eq!(config.waiting_file, PathBuf::from("/tmp/jd-test/waiting.jsonl"));
    }

    #[test]
    fn test_from_config() {
        let mut app_config = Config::default();
        app_config.scheduler.pool_size = 3;
        app_config.scheduler.sweep_interval_ms = 200;
        app_config.storage.data_dir = PathBuf::from("/tmp/jd-data");

        let config = SchedulerConfig::from_config(&app_config);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.sweep_interval_ms, 200);
        assert_eq!(config.tasks_dir, PathBuf::from("/tmp/jd-data/tasks"));
    }
}
