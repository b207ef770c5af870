//! Configuration loading and management
//!
//! Handles parsing of `.trak.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::task::TaskType;

/// Configuration file name, looked up at the workspace root
pub const CONFIG_FILE_NAME: &str = ".trak.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store layout configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

/// Store layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the task files, relative to the workspace root
    #[serde(default = "default_store_dir")]
    pub dir: String,

    /// Active task file name inside the store directory
    #[serde(default = "default_active_file")]
    pub active_file: String,

    /// Archive file name inside the store directory
    #[serde(default = "default_archive_file")]
    pub archive_file: String,

    /// How long mutating commands wait for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_store_dir() -> String {
    ".trak".to_string()
}

fn default_active_file() -> String {
    "tasks.jsonl".to_string()
}

fn default_archive_file() -> String {
    "complete.jsonl".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            active_file: default_active_file(),
            archive_file: default_archive_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Task defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Category assigned when `add` is called without one
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Type assigned when `add` is called without one
    #[serde(default = "default_type")]
    pub default_type: String,
}

fn default_category() -> String {
    "simple".to_string()
}

fn default_type() -> String {
    "task".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_category: default_category(),
            default_type: default_type(),
        }
    }
}

impl Config {
    /// Load configuration from a `.trak.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the workspace root, or return defaults when
    /// no config file exists. A present but invalid file is an error rather
    /// than a silent fallback, since it controls where task data lands.
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the task files
    pub fn store_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.store.dir)
    }

    /// Path of the active task file
    pub fn active_path(&self, root: &Path) -> PathBuf {
        self.store_dir(root).join(&self.store.active_file)
    }

    /// Path of the archive file
    pub fn archive_path(&self, root: &Path) -> PathBuf {
        self.store_dir(root).join(&self.store.archive_file)
    }

    /// Path of the lock file guarding both task files
    pub fn lock_path(&self, root: &Path) -> PathBuf {
        let name = format!("{}.lock", self.store.active_file);
        self.store_dir(root).join(name)
    }

    fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.dir.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "store.dir cannot be empty".to_string(),
            ));
        }
        validate_file_name(&self.active_file, "store.active_file")?;
        validate_file_name(&self.archive_file, "store.archive_file")?;
        if self.active_file == self.archive_file {
            return Err(Error::InvalidConfig(
                "store.active_file and store.archive_file must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_file_name(name: &str, field: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidConfig(format!(
            "{field} must be a plain file name, got '{name}'"
        )));
    }
    Ok(())
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        if self.default_category.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.default_category cannot be empty".to_string(),
            ));
        }
        self.default_type.parse::<TaskType>().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_type: unknown type '{}'",
                self.default_type
            ))
        })?;
        Ok(())
    }
}
