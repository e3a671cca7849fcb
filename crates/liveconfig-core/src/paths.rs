//! File system paths used by liveconfig.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;
use tracing::debug;

/// Well-known storage key of the settings cache. The file name keeps the
/// key the editor uses for its own local copy.
const SETTINGS_FILE_NAME: &str = "clay-settings.json";

/// Manages file system paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.liveconfig)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.liveconfig`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".liveconfig"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.liveconfig).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.liveconfig/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the persisted settings cache (~/.liveconfig/clay-settings.json).
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE_NAME)
    }

    /// Get the logs directory (~/.liveconfig/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.liveconfig/logs/liveconfig.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("liveconfig.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        debug!(base_dir = %self.base_dir.display(), "Ensuring liveconfig directories");
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
