// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to apply environment overrides: {0}")]
    Layer(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub controller: ControllerSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.controller.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub peer_timeout_ms: u64,
    pub metrics: MetricsSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            peer_timeout_ms: 2000,
            metrics: MetricsSettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if self.peer_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.peer_timeout_ms must be greater than 0".into(),
            ));
        }
        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.metrics.path must start with '/', got '{}'",
                self.metrics.path
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub host: String,
    pub instances: usize,
    pub interval_ms: u64,
    /// Defaults to `pong-server` next to the controller executable.
    pub server_binary: Option<PathBuf>,
    pub state_file: PathBuf,
    pub log_dir: PathBuf,
    pub startup_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            instances: 2,
            interval_ms: 1000,
            server_binary: None,
            state_file: PathBuf::from(".pong-session.json"),
            log_dir: PathBuf::from("."),
            startup_timeout_ms: 5000,
            request_timeout_ms: 2000,
        }
    }
}

impl ControllerSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances < 2 {
            return Err(ConfigError::Invalid(format!(
                "controller.instances must be at least 2, got {}",
                self.instances
            )));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "controller.interval_ms must be greater than 0".into(),
            ));
        }
        if self.request_timeout_ms == 0 || self.startup_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "controller timeouts must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
