//! Application configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler limits and timing
    pub scheduler: SchedulerSettings,

    /// Storage locations
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .jobdaemon.yml
        let local_config = PathBuf::from(".jobdaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/jobdaemon/jobdaemon.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("jobdaemon").join("jobdaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Scheduler limits and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Admission capacity
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    /// Pause between sweeps in milliseconds
    #[serde(rename = "sweep-interval-ms")]
    pub sweep_interval_ms: u64,

    /// Graceful stop deadline in milliseconds
    #[serde(rename = "stop-timeout-ms")]
    pub stop_timeout_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            pool_size: 10,
            sweep_interval_ms: 50,
            stop_timeout_ms: 10_000,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the task store, status ledger, and waiting queue
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/jobdaemon on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("jobdaemon"))
            .unwrap_or_else(|| PathBuf::from(".jobdaemon"));

        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.scheduler.pool_size, 10);
        assert_eq!(config.scheduler.sweep_interval_ms, 50);
        assert_eq!(config.scheduler.stop_timeout_ms, 10_000);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
scheduler:
  pool-size: 4
  sweep-interval-ms: 250
  stop-timeout-ms: 5000

storage:
  data-dir: /tmp/jd-data
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheduler.pool_size, 4);
        assert_eq!(config.scheduler.sweep_interval_ms, 250);
        assert_eq!(config.scheduler.stop_timeout_ms, 5000);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/jd-data"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
scheduler:
  pool-size: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.scheduler.pool_size, 2);

        // Defaults for unspecified
        assert_eq!(config.scheduler.sweep_interval_ms, 50);
        assert_eq!(config.scheduler.stop_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_explicit_missing_path_is_error() {
        let result = Config::load(Some(&PathBuf::from("/nonexistent/jobdaemon.yml")));
        assert!(result.is_err());
    }
}
