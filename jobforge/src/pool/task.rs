//! Task boundary types: errors, the task closure, and the job pairing.

use super::metadata::JobMetadata;
use thiserror::Error;

/// Errors surfaced at the task boundary.
///
/// Tasks return `Result<_, TaskError>` instead of unwinding; the worker
/// inspects the variant and retry becomes a normal branch. Panics inside a
/// task are caught and mapped to [`TaskError::Panicked`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task body reported a failure.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The job was cancelled before it started executing.
    #[error("job cancelled before execution")]
    Cancelled,

    /// The job exceeded its wall-clock deadline.
    #[error("job timed out")]
    TimedOut,

    /// The job was rejected or dropped because the pool is shutting down.
    #[error("job rejected: pool is shut down")]
    Rejected,
}

impl TaskError {
    /// Convenience constructor for ad-hoc failure messages.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A unit of work: the task closure. `FnMut` because a retried job
/// re-executes the same closure.
pub type TaskFn = Box<dyn FnMut() -> Result<(), TaskError> + Send + 'static>;

/// Hook invoked when the pool reaches a terminal outcome without a normal
/// return from the task: pre-execution cancellation and timeout. Used to
/// fail result handles promptly.
pub(crate) type AbandonHook = Box<dyn Fn(TaskError) + Send + 'static>;

/// A job: metadata plus the task to execute.
///
/// Owned exclusively by the queue between push and pop, and by the worker
/// thereafter. When timeout enforcement is active the task is moved into an
/// inner thread for the duration of the attempt.
pub struct Job {
    pub meta: JobMetadata,
    pub(crate) task: TaskFn,
    pub(crate) abandon: Option<AbandonHook>,
}

impl Job {
    /// Pairs a descriptor with a task closure.
    pub fn new(meta: JobMetadata, task: TaskFn) -> Self {
        Self {
            meta,
            task,
            abandon: None,
        }
    }

    pub(crate) fn with_abandon_hook(mut self, hook: AbandonHook) -> Self {
        self.abandon = Some(hook);
        self
    }

    /// Notifies the abandon hook, if any, that this job terminated without
    /// the task returning.
    pub(crate) fn notify_abandoned(&self, error: TaskError) {
        if let Some(hook) = &self.abandon {
            hook(error);
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("meta", &self.meta).finish()
    }
}
