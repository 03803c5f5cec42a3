//! Core configuration
//!
//! Stored in `<data_dir>/docsmith.json`. Every field has a default, so a
//! missing or partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "docsmith.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Delay of the mocked generation service
    pub generation_delay_ms: u64,

    /// API calls charged per generation
    pub generation_api_calls: u64,

    /// Storage (GB) charged per generation
    pub generation_storage_gb: f64,

    /// Seed demo projects on a user's first login
    pub seed_demo_projects: bool,

    /// Quota percentage that raises a warning
    pub warning_threshold: f64,

    /// Quota percentage that raises a critical alert
    pub critical_threshold: f64,

    /// Event bus channel capacity
    pub event_capacity: usize,

    /// SQLite file name inside the data directory
    pub database_file: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            generation_delay_ms: 3000,
            generation_api_calls: 1,
            generation_storage_gb: 0.1,
            seed_demo_projects: true,
            warning_threshold: 75.0,
            critical_threshold: 90.0,
            event_capacity: 256,
            database_file: "snapshots.db".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load from `<dir>/docsmith.json`.
    /// Returns defaults on any I/O or parse error (graceful degradation).
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to `<dir>/docsmith.json`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).context("Failed to create data directory for config")?;
        let path = dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }
}
