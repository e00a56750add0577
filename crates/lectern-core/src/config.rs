use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LecternError, Result};

/// Top-level configuration for the Lectern engine.
///
/// Loaded from `~/.lectern/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    pub general: GeneralConfig,
    pub pipeline: PipelineConfig,
    pub retrieval: RetrievalConfig,
    pub session: SessionConfig,
}

impl LecternConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LecternConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LecternError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root directory for per-session uploads and indexes.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.lectern/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Query pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default neighbor count when the caller does not supply one.
    pub default_k: usize,
    /// How many reformulated variants to request from the model.
    pub expansion_count: usize,
    /// Timeout for the reformulation call, in seconds.
    pub expansion_timeout_secs: u64,
    /// Timeout for the answer synthesis call, in seconds.
    pub synthesis_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            expansion_count: 5,
            expansion_timeout_secs: 30,
            synthesis_timeout_secs: 60,
        }
    }
}

/// Retrieval fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum retrieval calls in flight at once.
    pub max_concurrent: usize,
    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            timeout_secs: 30,
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions whose last completed query is older than this are reclaimed.
    pub retention_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}
