//! Session and execution-unit settings.
//!
//! Defaults come from the host; a JSON file may override any subset of
//! fields, and the CLI overrides the file.

use fermion_compute::RenderSettings;
use fermion_core::{
    host_parallelism, RequestLimits, DEFAULT_TILE_SIZE, DEFAULT_UPDATE_INTERVAL, MAX_DIM,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_dim: u32,
    pub update_interval_ms: u64,
    /// Upper bound for the requested concurrency.
    pub hardware_parallelism: usize,
    pub unit: UnitConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::detect()
    }
}

impl SessionConfig {
    /// Defaults for the current host.
    pub fn detect() -> Self {
        Self {
            max_dim: MAX_DIM,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL.as_millis() as u64,
            hardware_parallelism: host_parallelism(),
            unit: UnitConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn limits(&self) -> RequestLimits {
        RequestLimits::new(self.max_dim, self.hardware_parallelism.max(1) as u32)
    }
}

/// Settings handed to the execution unit when it is spawned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    pub tile_size: u32,
    /// Artificial pause after each tile, for watching progress on small scenes.
    pub tile_delay_ms: Option<u64>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            tile_delay_ms: None,
        }
    }
}

impl UnitConfig {
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            tile_size: self.tile_size.max(1),
            tile_delay: self.tile_delay_ms.map(Duration::from_millis),
        }
    }
}
