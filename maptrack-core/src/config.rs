//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/maptrack/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/maptrack/` (~/.config/maptrack/)
//! - Data: `$XDG_DATA_HOME/maptrack/` (~/.local/share/maptrack/)
//! - State/Logs: `$XDG_STATE_HOME/maptrack/` (~/.local/state/maptrack/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Session store tuning
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session store tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Days of history kept by retention cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Active sessions older than this at recovery time are treated as
    /// abandoned by an unclean shutdown and force-closed
    #[serde(default = "default_max_session_hours")]
    pub max_session_hours: i64,

    /// Minimum minutes between retention cleanup runs
    #[serde(default = "default_cleanup_interval_mins")]
    pub cleanup_interval_mins: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_session_hours: default_max_session_hours(),
            cleanup_interval_mins: default_cleanup_interval_mins(),
        }
    }
}

fn default_retention_days() -> i64 {
    90
}

fn default_max_session_hours() -> i64 {
    8
}

fn default_cleanup_interval_mins() -> i64 {
    60
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Path to the config file
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("maptrack").join("config.toml")
    }

    /// Data directory for the persisted store
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("maptrack")
    }

    /// Path to the SQLite database backing the store
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("maptrack.db")
    }

    /// State directory for logs
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("maptrack")
    }

    /// Path to the current log file
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("maptrack.log")
    }
}
