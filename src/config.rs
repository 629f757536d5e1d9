//! Dashboard configuration, read from a JSON file.

use crate::data::{DataSource, Unit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "household_dashboard.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("age_smoothing must be an odd window between 1 and 9, got {0}")]
    Smoothing(usize),
    #[error("cache_ttl_secs must be greater than zero")]
    ZeroTtl,
    #[error("fetch_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Initial state of the sidebar controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayDefaults {
    pub unit: Unit,
    pub show_unknowns: bool,
    pub age_smoothing: usize,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            unit: Unit::Percent,
            show_unknowns: true,
            age_smoothing: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: DataSource,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Overrides the household total derived from the dwelling table.
    pub total_households: Option<u64>,
    pub senior_age: u32,
    pub display: DisplayDefaults,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Bundled,
            cache_ttl_secs: 600,
            fetch_timeout_secs: 20,
            total_households: None,
            senior_age: crate::stats::SENIOR_AGE,
            display: DisplayDefaults::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Explicit path, else the default file if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = self.display.age_smoothing;
        if !(1..=9).contains(&w) || w % 2 == 0 {
            return Err(ConfigError::Smoothing(w));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
