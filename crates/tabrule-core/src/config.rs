//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! workers = 4
//! queue_capacity = 64
//! date_order = "day_first"
//!
//! [inference]
//! sample_size = 1000
//! match_threshold = 0.9
//! categorical_max_distinct = 20
//! categorical_max_ratio = 0.05
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabrule_transform::{DateOrder, InferenceSettings};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker threads in the execution pool.
    pub workers: usize,
    /// Tasks that may wait for a worker before `submit` blocks.
    pub queue_capacity: usize,
    pub inference: InferenceSettings,
    /// Ordering tried first for ambiguous numeric dates.
    pub date_order: DateOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
            inference: InferenceSettings::default(),
            date_order: DateOrder::DayFirst,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_toml_str(&contents, path)?;
                info!(path = %path.display(), "loaded engine config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity must be at least 1");
        }
        if self.inference.sample_size == 0 {
            return invalid("inference.sample_size must be at least 1");
        }
        if !(self.inference.match_threshold > 0.0 && self.inference.match_threshold <= 1.0) {
            return invalid("inference.match_threshold must be in (0, 1]");
        }
        Ok(())
    }

    /// Inference settings with the configured date order applied.
    pub fn inference_settings(&self) -> InferenceSettings {
        InferenceSettings {
            date_order: self.date_order,
            ..self.inference
        }
    }
}
