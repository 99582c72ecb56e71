//! Configuration file handling for ~/.jobforge/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. Settings
//! structs live in [`super::settings`].

use super::settings::ConfigFile;
use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.jobforge/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }
}

/// Get the path to the config directory (~/.jobforge).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jobforge")
}

/// Get the path to the config file (~/.jobforge/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("pool")) {
        if let Some(value) = section.get("threads") {
            config.pool.threads = parse_positive("pool", "threads", value)?;
        }
        if let Some(value) = section.get("max_queue") {
            config.pool.max_queue = parse_positive("pool", "max_queue", value)?;
        }
    }

    if let Some(section) = ini.section(Some("jobs")) {
        if let Some(value) = section.get("timeout") {
            config.jobs.timeout_secs = parse_seconds("jobs", "timeout", value)?;
        }
    }

    if let Some(section) = ini.section(Some("shutdown")) {
        if let Some(value) = section.get("deadline") {
            config.shutdown.deadline_secs = parse_seconds("shutdown", "deadline", value)?;
        }
    }

    Ok(config)
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    let parsed: usize = value.parse().map_err(|_| invalid(section, key, value, "not a number"))?;
    if parsed == 0 {
        return Err(invalid(section, key, value, "must be at least 1"));
    }
    Ok(parsed)
}

fn parse_seconds(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .parse()
        .map_err(|_| invalid(section, key, value, "not a number of seconds"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn to_config_string(config: &ConfigFile) -> String {
    format!(
        "; JobForge configuration\n\
         \n\
         [pool]\n\
         ; Number of worker threads\n\
         threads = {}\n\
         ; Queue capacity (producers block when full)\n\
         max_queue = {}\n\
         \n\
         [jobs]\n\
         ; Per-job timeout in seconds (0 = no timeout)\n\
         timeout = {}\n\
         \n\
         [shutdown]\n\
         ; Seconds to wait for in-flight jobs before forcing shutdown\n\
         deadline = {}\n",
        config.pool.threads,
        config.pool.max_queue,
        config.jobs.timeout_secs,
        config.shutdown.deadline_secs,
    )
}
