use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8910";
pub const DEFAULT_ENDPOINT: &str = "/hbbtv/jsonrpc";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_COUNTDOWN_SECS: u64 = 60;

/// Server config, loaded from TOML. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address (host:port).
    pub bind: String,
    /// WebSocket path for ordinary applications.
    pub endpoint: String,
    /// WebSocket path whose peers are operator applications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opapp_endpoint: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub intents: IntentsConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentsConfig {
    /// Only send intents to connections that reported voice readiness.
    pub require_voice_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds an operator application may stay transient.
    pub countdown_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            opapp_endpoint: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            intents: IntentsConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            require_voice_ready: true,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }
}

impl Config {
    /// Load config from a TOML file path. Returns None if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        Ok(Some(config))
    }

    /// Save config to a TOML file path, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        Ok(())
    }

    pub fn countdown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lifecycle.countdown_secs)
    }
}

/// `<config dir>/tvrpc/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tvrpc").join("config.toml"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {}", .0.display(), .1)]
    ReadFailed(PathBuf, std::io::Error),

    #[error("failed to parse config {}: {}", .0.display(), .1)]
    ParseFailed(PathBuf, toml::de::Error),

    #[error("failed to write config {}: {}", .0.display(), .1)]
    WriteFailed(PathBuf, std::io::Error),

    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
}
