use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;


/// Tunables for one monitored tree. Every field has a default, so an empty
/// settings file (or no file at all) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleSettings {
    /// Class marker identifying Item nodes.
    #[serde(default = "default_item_marker")]
    pub item_marker: String,
    /// Quiet time with no relevant change before a relabel is committed. Default: 700.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    /// Upper bound on the wait for the first relabel after start. Default: 7000.
    #[serde(default = "default_initial_ceiling_ms")]
    pub initial_ceiling_ms: u64,
    /// How long after a relabel its own change notifications are ignored. Default: 80.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    /// Ancestor levels considered when locating the container. Default: 10.
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,
}

fn default_item_marker() -> String {
    "video-playlist-episode-title-text".into()
}

fn default_quiet_period_ms() -> u64 {
    700
}

fn default_initial_ceiling_ms() -> u64 {
    7000
}

fn default_grace_ms() -> u64 {
    80
}

fn default_max_ancestor_depth() -> usize {
    10
}

impl Default for SettleSettings {
    fn default() -> Self {
        SettleSettings {
            item_marker: default_item_marker(),
            quiet_period_ms: default_quiet_period_ms(),
            initial_ceiling_ms: default_initial_ceiling_ms(),
            grace_ms: default_grace_ms(),
            max_ancestor_depth: default_max_ancestor_depth(),
        }
    }
}


impl SettleSettings {
    /// Parse settings from YAML (JSON is accepted too) and validate them.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if input.trim().is_empty() {
            return Ok(SettleSettings::default());
        }
        let settings: SettleSettings = serde_yaml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "settle::config", path = %path.display(), "no settings file; using defaults");
                Ok(SettleSettings::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_marker.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "item_marker",
                reason: "must not be empty".into(),
            });
        }
        if self.quiet_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "quiet_period_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.grace_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "grace_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_ancestor_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_ancestor_depth",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
