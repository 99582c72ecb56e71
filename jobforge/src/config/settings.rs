//! Settings structs and their defaults.

/// Default number of worker threads.
pub const DEFAULT_THREADS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_MAX_QUEUE: usize = 64;

/// Default per-job timeout in seconds (0 disables the timeout).
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 0;

/// Default shutdown drain deadline in seconds.
pub const DEFAULT_SHUTDOWN_DEADLINE_SECS: u64 = 5;

/// `[pool]` section: worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Number of worker threads.
    pub threads: usize,
    /// Queue capacity; producers block once this many jobs are queued.
    pub max_queue: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            max_queue: DEFAULT_MAX_QUEUE,
        }
    }
}

/// `[jobs]` section: per-job policy defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Per-job wall-clock deadline in seconds. Zero disables it.
    pub timeout_secs: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
        }
    }
}

/// `[shutdown]` section: drain behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSettings {
    /// How long shutdown waits for in-flight jobs before forcing.
    pub deadline_secs: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_SHUTDOWN_DEADLINE_SECS,
        }
    }
}

/// The full configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub pool: PoolSettings,
    pub jobs: JobSettings,
    pub shutdown: ShutdownSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let config = ConfigFile::default();
        assert_eq!(config.pool.threads, DEFAULT_THREADS);
        assert_eq!(config.pool.max_queue, DEFAULT_MAX_QUEUE);
        assert_eq!(config.jobs.timeout_secs, DEFAULT_JOB_TIMEOUT_SECS);
        assert_eq!(config.shutdown.deadline_secs, DEFAULT_SHUTDOWN_DEADLINE_SECS);
    }
}
