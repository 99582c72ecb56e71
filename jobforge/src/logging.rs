//! Logging setup for the library and CLI.
//!
//! Log lines go to two places at once: a per-session file under `log_dir`
//! (truncated on startup, written through a non-blocking appender so worker
//! threads never stall on disk) and stdout for interactive use. Verbosity
//! comes from `RUST_LOG`, falling back to `info`.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directory log files are written to by default.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "jobforge.log";

/// Keeps the non-blocking file writer alive; dropping it flushes and closes
/// the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Installs the global tracing subscriber with file and stdout output.
///
/// Returns a [`LoggingGuard`] the caller must hold for the lifetime of the
/// program. Fails if the log directory or file cannot be created. Can only
/// be called once per process.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let file = open_session_log(log_dir, log_file)?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(verbosity_filter())
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Opens the session log file, truncating anything left from a previous run.
fn open_session_log(log_dir: &str, log_file: &str) -> Result<File, io::Error> {
    fs::create_dir_all(log_dir)?;
    File::create(Path::new(log_dir).join(log_file))
}

fn verbosity_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
