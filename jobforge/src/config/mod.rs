//! User configuration for the pool and CLI.
//!
//! Settings are loaded from `~/.jobforge/config.ini` with sensible defaults;
//! CLI arguments override config file values when specified.

mod file;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, JobSettings, PoolSettings, ShutdownSettings, DEFAULT_JOB_TIMEOUT_SECS,
    DEFAULT_MAX_QUEUE, DEFAULT_SHUTDOWN_DEADLINE_SECS, DEFAULT_THREADS,
};
