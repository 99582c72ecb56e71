//! Pool configuration.

use std::time::Duration;

/// Default number of worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Shutdown drain deadline used when the pool is dropped without an
/// explicit shutdown.
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Configuration for a [`WorkerPool`](super::WorkerPool).
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Number of worker threads. Minimum 1.
    pub threads: usize,
    /// Queue capacity; producers block once this many jobs are queued.
    /// Minimum 1.
    pub max_queue: usize,
}

impl PoolConfig {
    /// Creates a configuration with the given thread count and queue capacity.
    pub fn new(threads: usize, max_queue: usize) -> Self {
        Self { threads, max_queue }
    }

    /// Clamps both fields to their minimum of one.
    pub(crate) fn normalized(self) -> Self {
        Self {
            threads: self.threads.max(1),
            max_queue: self.max_queue.max(1),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKER_THREADS,
            max_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<&crate::config::PoolSettings> for PoolConfig {
    fn from(settings: &crate::config::PoolSettings) -> Self {
        Self {
            threads: settings.threads,
            max_queue: settings.max_queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.threads, DEFAULT_WORKER_THREADS);
        assert_eq!(config.max_queue, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_normalized_clamps_zeroes() {
        let config = PoolConfig::new(0, 0).normalized();
        assert_eq!(config.threads, 1);
        assert_eq!(config.max_queue, 1);
    }
}
