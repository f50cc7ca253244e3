//! Configuration for the wellbeing companion.

use crate::camera::Facing;
use crate::core::store::DEFAULT_STORE_KEY;
use crate::core::windowing::DEFAULT_WINDOW_DAYS;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for the companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path for the wellbeing document and transparency stats
    pub data_path: PathBuf,

    /// Storage key of the wellbeing document
    pub store_key: String,

    /// Length of the recent-stress window in days
    pub window_days: u32,

    /// IANA timezone used for calendar days
    pub timezone: String,

    /// Camera to request for scans
    pub camera_facing: Facing,

    /// Outbound telemetry
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aura-companion");

        Self {
            data_path: data_dir,
            store_key: DEFAULT_STORE_KEY.to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            timezone: "UTC".to_string(),
            camera_facing: Facing::User,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aura-companion")
            .join("config.json")
    }

    /// Path of the persisted transparency stats.
    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// The configured timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        if self.window_days == 0 {
            return Err(ConfigError::ParseError(
                "window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where check-ins and incidents are mirrored, if anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Bearer token sent to the gateway
    pub token: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8787,
            token: String::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store_key, "aura_data");
        assert_eq!(config.window_days, 7);
        assert_eq!(config.camera_facing, Facing::User);
        assert!(!config.telemetry.enabled);
        assert_eq!(config.tz().unwrap(), Tz::UTC);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            timezone: "Asia/Kolkata".to_string(),
            window_days: 14,
            camera_facing: Facing::Environment,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.tz().unwrap(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"window_days": 3}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.window_days, 3);
        assert_eq!(loaded.store_key, "aura_data");
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timezone": "Mars/Olympus"}"#).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }
}
