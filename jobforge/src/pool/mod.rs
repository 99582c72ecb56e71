//! Worker pool and job scheduling.
//!
//! This module provides an in-process execution engine for user-submitted
//! jobs with per-job policies: priority, bounded retry, timeout, and
//! cooperative cancellation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        WorkerPool                            │
//! │  submit jobs, receive result futures, coordinate shutdown    │
//! ├──────────────────────────────────────────────────────────────┤
//! │                         JobQueue                             │
//! │  bounded priority queue: backpressure, FIFO within priority  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  worker thread │ worker thread │ worker thread │ ...         │
//! │  pop → cancel check → execute (timeout guard) → retry/done   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Job**: a [`JobMetadata`] descriptor paired with a task closure
//!   returning `Result<(), TaskError>`.
//!
//! - **Priority**: higher values dispatch earlier; equal priorities run in
//!   submission order.
//!
//! - **Retry**: a failed task is re-enqueued at its original priority until
//!   its `max_retries` budget is spent. Result-returning submissions never
//!   retry.
//!
//! - **Timeout and cancellation**: both are cooperative. The pool sets the
//!   job's [`CancelToken`]; task bodies poll it to stop early. A task that
//!   outlives its deadline is abandoned to an orphaned thread and counted
//!   as failed.
//!
//! - **Shutdown**: waits for in-flight work up to a deadline, then closes
//!   the queue and joins every worker.
//!
//! # Example
//!
//! ```ignore
//! use jobforge::pool::{JobMetadata, PoolConfig, TaskError, WorkerPool};
//! use std::time::Duration;
//!
//! let pool = WorkerPool::new(PoolConfig::new(4, 64));
//!
//! let meta = JobMetadata::new(1, "flaky-fetch").with_max_retries(2);
//! pool.submit(meta, || {
//!     fetch().map_err(|e| TaskError::failed(e.to_string()))
//! });
//!
//! let future = pool.submit_with_result(JobMetadata::new(2, "sum"), || Ok(1 + 1));
//! assert_eq!(future.wait(), Ok(2));
//!
//! pool.shutdown(Duration::from_secs(5));
//! ```

mod config;
mod core;
mod future;
mod metadata;
mod queue;
mod task;
mod worker;

pub use config::{
    PoolConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_DEADLINE, DEFAULT_WORKER_THREADS,
};
pub use self::core::{ShutdownOutcome, WorkerPool};
pub use future::JobFuture;
pub use metadata::{CancelToken, JobMetadata};
pub use queue::{JobQueue, Popped};
pub use task::{Job, TaskError, TaskFn};
