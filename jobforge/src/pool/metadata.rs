//! Job descriptors and cooperative cancellation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, observable from any thread.
///
/// The pool never forcibly kills a task: it sets this flag (on an external
/// cancel request or on timeout) and the task is expected to poll
/// [`is_cancelled`](CancelToken::is_cancelled) and return early. Tasks that
/// never poll simply run to completion.
///
/// Clones share the same flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Irreversible.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Descriptor carried by every job: identity, scheduling policy, retry
/// budget, timeout, and the cancellation flag.
///
/// Created at submission and mutated only by the executing worker, except
/// for the cancel flag which any thread may set through a [`CancelToken`].
///
/// # Example
///
/// ```ignore
/// use jobforge::pool::JobMetadata;
/// use std::time::Duration;
///
/// let meta = JobMetadata::new(7, "resize-image")
///     .with_priority(5)
///     .with_max_retries(2)
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug)]
pub struct JobMetadata {
    /// Caller-supplied identity; not required to be unique.
    pub id: i64,
    /// Human label used in logs and metrics.
    pub name: String,
    /// Dispatch ordering: higher values run earlier. Ties are FIFO.
    pub priority: i32,
    /// Upper bound on retries after task errors.
    pub max_retries: u32,
    /// Retries consumed so far. Maintained by the pool.
    pub current_retry: u32,
    /// Master retry switch. Forced off for result-returning submissions,
    /// where a retry would complete the result handle twice.
    pub allow_retry: bool,
    /// Per-job wall-clock deadline. `Duration::ZERO` disables the timeout.
    pub timeout: Duration,
    /// When the pool accepted the job. Refreshed at submission.
    pub submitted_at: Instant,
    cancel: CancelToken,
}

impl JobMetadata {
    /// Creates a descriptor with default policy: priority 0, no retries,
    /// retry allowed, no timeout.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority: 0,
            max_retries: 0,
            current_retry: 0,
            allow_retry: true,
            timeout: Duration::ZERO,
            submitted_at: Instant::now(),
            cancel: CancelToken::new(),
        }
    }

    /// Sets the dispatch priority (higher runs earlier).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-job wall-clock deadline. Zero disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a token that cancels this job from any thread. Task bodies
    /// capture a clone to poll for cooperative cancellation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests cancellation of this job.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// True once cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults() {
        let meta = JobMetadata::new(1, "job");

        assert_eq!(meta.id, 1);
        assert_eq!(meta.name, "job");
        assert_eq!(meta.priority, 0);
        assert_eq!(meta.max_retries, 0);
        assert_eq!(meta.current_retry, 0);
        assert!(meta.allow_retry);
        assert_eq!(meta.timeout, Duration::ZERO);
        assert!(!meta.is_cancel_requested());
    }

    #[test]
    fn test_metadata_builders() {
        let meta = JobMetadata::new(2, "job")
            .with_priority(9)
            .with_max_retries(3)
            .with_timeout(Duration::from_millis(100));

        assert_eq!(meta.priority, 9);
        assert_eq!(meta.max_retries, 3);
        assert_eq!(meta.timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let meta = JobMetadata::new(3, "job");
        let token = meta.cancel_token();

        assert!(!token.is_cancelled());
        token.cancel();
        assert!(meta.is_cancel_requested());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let meta = JobMetadata::new(4, "job");
        let token = meta.cancel_token();

        let handle = std::thread::spawn(move || token.cancel());
        handle.join().unwrap();

        assert!(meta.is_cancel_requested());
    }
}
