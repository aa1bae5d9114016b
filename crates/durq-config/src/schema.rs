//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Where a queue keeps its jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Volatile database that disappears on close.
    Memory,
    /// Database file on disk.
    File(PathBuf),
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Database path. An empty string selects an in-memory database.
    #[serde(default = "default_location")]
    pub location: String,

    /// Maximum number of jobs held in memory per rehydration.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_location() -> String {
    dirs::home_dir()
        .map(|home| home.join(".durq").join("queue.db"))
        .unwrap_or_else(|| PathBuf::from("durq.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_batch_size() -> usize {
    10
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            batch_size: default_batch_size(),
        }
    }
}

impl QueueConfig {
    /// Create a queue configuration for the given location.
    pub fn new(location: impl Into<String>, batch_size: usize) -> Self {
        Self {
            location: location.into(),
            batch_size,
        }
    }

    /// Create a configuration backed by an in-memory database.
    pub fn in_memory(batch_size: usize) -> Self {
        Self::new("", batch_size)
    }

    /// Resolve the storage location.
    pub fn storage(&self) -> StorageLocation {
        if self.location.is_empty() {
            StorageLocation::Memory
        } else {
            StorageLocation::File(PathBuf::from(&self.location))
        }
    }

    /// Reject settings the queue cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "queue.batch_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: default_level(),
        }
    }
}
