//! Viewer configuration
//!
//! Settings are read from a JSON file and can then be overridden through
//! environment variables:
//!
//! - `SCRIPTORIUM_CAPTURE_DELAY_MS`: wait after each page change during export (default: 50)
//! - `SCRIPTORIUM_NEAREST_THRESHOLD_PX`: pick radius for angle points (default: 10)
//! - `SCRIPTORIUM_EXPORT_FILE_NAME`: name of the exported PDF (default: annotated-document.pdf)
//! - `SCRIPTORIUM_HTTP_TIMEOUT_SECS`: manifest fetch timeout (default: 30)

use scriptorium_core::{Color, MeasurementKind, SessionSettings, DEFAULT_NEAREST_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CAPTURE_DELAY_MS: &str = "SCRIPTORIUM_CAPTURE_DELAY_MS";
pub const ENV_NEAREST_THRESHOLD_PX: &str = "SCRIPTORIUM_NEAREST_THRESHOLD_PX";
pub const ENV_EXPORT_FILE_NAME: &str = "SCRIPTORIUM_EXPORT_FILE_NAME";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "SCRIPTORIUM_HTTP_TIMEOUT_SECS";

const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub capture_delay_ms: u64,
    pub nearest_threshold_px: f64,
    pub export_file_name: String,
    pub http_timeout_secs: u64,
    /// Replaces the default color of the listed kinds
    pub measurement_colors: BTreeMap<MeasurementKind, Color>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            capture_delay_ms: 50,
            nearest_threshold_px: DEFAULT_NEAREST_THRESHOLD,
            export_file_name: "annotated-document.pdf".to_string(),
            http_timeout_secs: 30,
            measurement_colors: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ConfigEnvelope {
    pub(crate) version: u32,
    pub(crate) config: ViewerConfig,
}

impl ConfigEnvelope {
    pub(crate) fn new(config: ViewerConfig) -> Self {
        Self { version: CONFIG_SCHEMA_VERSION, config }
    }
}

impl ViewerConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Read a configuration file written by [`ViewerConfig::save_to_file`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path.as_ref())?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != CONFIG_SCHEMA_VERSION {
            tracing::warn!(
                version = envelope.version,
                expected = CONFIG_SCHEMA_VERSION,
                "configuration written by a different schema version"
            );
        }
        envelope.config.validated()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(&ConfigEnvelope::new(self.clone()))?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Apply every `SCRIPTORIUM_*` variable that is set
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CAPTURE_DELAY_MS) {
            self.capture_delay_ms = parse_value(ENV_CAPTURE_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_NEAREST_THRESHOLD_PX) {
            self.nearest_threshold_px = parse_value(ENV_NEAREST_THRESHOLD_PX, &value)?;
        }
        if let Some(value) = lookup(ENV_EXPORT_FILE_NAME) {
            self.export_file_name = value;
        }
        if let Some(value) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            self.http_timeout_secs = parse_value(ENV_HTTP_TIMEOUT_SECS, &value)?;
        }

        self.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !self.nearest_threshold_px.is_finite() || self.nearest_threshold_px <= 0.0 {
            return Err(ConfigError::InvalidValue("nearest_threshold_px".to_string()));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("export_file_name".to_string()));
        }
        Ok(self)
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Settings for a new annotation session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            nearest_threshold: self.nearest_threshold_px,
            measurement_colors: self.measurement_colors.clone(),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue(key.to_string()))
}
