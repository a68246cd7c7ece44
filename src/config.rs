//! Configuration loading and management
//!
//! Handles parsing of `.chronicle.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graph::GraphLayout;
use crate::model::{TaskPriority, TaskStatus};

/// Name of the config file, looked up in the working directory
pub const CONFIG_FILE: &str = ".chronicle.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Graph layout constants (presentation only)
    #[serde(default)]
    pub graph: GraphLayout,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory, relative to the working directory unless absolute
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(crate::store::DATA_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

/// Task defaults applied when an operation doesn't specify them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Status for new tasks
    #[serde(default = "default_status")]
    pub default_status: TaskStatus,

    /// Priority for new tasks
    #[serde(default = "default_priority")]
    pub default_priority: TaskPriority,
}

fn default_status() -> TaskStatus {
    TaskStatus::Todo
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_status: default_status(),
            default_priority: default_priority(),
        }
    }
}

impl Config {
    /// Load configuration from a `.chronicle.toml` file
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(base: &Path) -> Self {
        let config_path = base.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
