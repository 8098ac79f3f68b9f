//! Configuration for the CTG monitor.

use crate::core::events::DetectorConfig;
use crate::core::flags::FlagPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Nominal sampling rate of the recording (Hz); the detector inherits it
    /// through the loaded series
    pub sampling_rate_hz: f64,

    /// Samples handed out per stream advance
    pub chunk_size: usize,

    /// Trailing history used for each analysis tick (samples)
    pub trailing_window_samples: usize,

    /// Minimum history before any metrics are reported (samples)
    pub min_window_samples: usize,

    /// CSV recording to load
    pub dataset_path: PathBuf,

    /// Path for exporting reports
    pub export_path: PathBuf,

    /// Flag annotation policy
    pub flags: FlagPolicy,

    /// Event detection thresholds
    pub detector: DetectorConfig,

    /// HTTP boundary settings
    pub server: ServerSettings,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ctg-monitor");

        Self {
            sampling_rate_hz: 4.0,
            chunk_size: 5,
            trailing_window_samples: 300,
            min_window_samples: 50,
            dataset_path: PathBuf::from("ctg_data.csv"),
            export_path: data_dir.join("exports"),
            flags: FlagPolicy::default(),
            detector: DetectorConfig::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ctg-monitor")
            .join("config.json")
    }

    /// Ensure the export directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        Ok(())
    }
}

/// Settings for the HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sampling_rate_hz, 4.0);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.trailing_window_samples, 300);
        assert_eq!(config.min_window_samples, 50);
        assert_eq!(config.flags.active_window_secs, 5.0);
        assert_eq!(config.server.allowed_origins.len(), 2);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "sampling_rate_hz": 2.0, "chunk_size": 8 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.sampling_rate_hz, 2.0);
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.min_window_samples, 50);
    }

    #[test]
    fn test_sampling_rate_stored_once() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["sampling_rate_hz"], 4.0);
        assert!(json["detector"].get("sampling_rate_hz").is_none());
        assert_eq!(json["detector"]["late_offset_secs"], 20.0);

        // A stale detector rate in the file is ignored.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "sampling_rate_hz": 2.0, "detector": { "sampling_rate_hz": 8.0 } }"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.sampling_rate_hz, 2.0);
        assert_eq!(config.detector.sampling_rate_hz, 4.0);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.server.port = 9100;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 9100);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.chunk_size, 5);
    }
}
