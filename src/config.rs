//! Configuration management for the study timer

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::TimerError;
use crate::method::{MethodCatalog, TimerMethod};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Runs shorter than this many seconds are not saved (default: 10)
    #[serde(default = "default_min_session_secs")]
    pub min_session_secs: u64,

    /// Subject recorded when none was entered
    #[serde(default = "default_subject")]
    pub default_subject: String,

    /// Tick period in milliseconds (default: 1000)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Study session retention in days (default: 30)
    #[serde(default = "default_session_retention_days")]
    pub session_retention_days: u64,

    /// Log file retention in days (default: 7)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,

    /// Method selected at startup
    #[serde(default = "default_method")]
    pub default_method: String,

    /// Extra methods; an entry with a built-in id replaces that method
    #[serde(default)]
    pub custom_methods: Vec<TimerMethod>,
}

fn default_min_session_secs() -> u64 {
    10
}

fn default_subject() -> String {
    "Study time".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_session_retention_days() -> u64 {
    30
}

fn default_log_retention_days() -> u64 {
    7
}

fn default_method() -> String {
    "pomodoro".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_session_secs: default_min_session_secs(),
            default_subject: default_subject(),
            tick_interval_ms: default_tick_interval_ms(),
            session_retention_days: default_session_retention_days(),
            log_retention_days: default_log_retention_days(),
            default_method: default_method(),
            custom_methods: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Built-in methods merged with `custom_methods`
    pub fn catalog(&self) -> Result<MethodCatalog, TimerError> {
        MethodCatalog::builtin().with_methods(self.custom_methods.clone())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Get the base configuration directory (~/.studytimer)
/// Falls back to ./.studytimer if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".studytimer")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".studytimer"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Get the path to the study sessions file
pub fn sessions_file_path() -> PathBuf {
    config_dir().join(crate::session::store::STUDY_SESSIONS_FILE)
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_session_secs, 10);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.session_retention_days, 30);
        assert_eq!(config.default_method, "pomodoro");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("min_session_secs = 60\n").unwrap();
        assert_eq!(parsed.min_session_secs, 60);
        assert_eq!(parsed.default_subject, "Study time");
        assert!(parsed.custom_methods.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_custom_methods() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.custom_methods.push(
            TimerMethod::standard("deep", "Deep work", 3600, 600).with_description("One hour"),
        );
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.custom_methods.len(), 1);
        assert_eq!(loaded.custom_methods[0].id, "deep");

        let catalog = loaded.catalog().unwrap();
        assert_eq!(catalog.get("deep").unwrap().work_duration_secs, 3600);
        assert!(catalog.get("pomodoro").is_ok());
    }

    #[test]
    fn test_invalid_custom_method_is_rejected() {
        let mut config = Config::default();
        config
            .custom_methods
            .push(TimerMethod::standard("broken", "Broken", 0, 60));
        assert!(matches!(
            config.catalog(),
            Err(TimerError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "min_session_secs = \"ten\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".studytimer"));
    }

    #[test]
    fn test_try_config_dir() {
        if let Some(path) = try_config_dir() {
            assert!(path.ends_with(".studytimer"));
        }
    }
}
