//! JobForge - Multithreaded job execution engine
//!
//! This library provides an in-process worker pool that accepts user-submitted
//! units of work, schedules them across a fixed set of worker threads, and
//! enforces per-job policies: priority ordering, bounded queueing with
//! backpressure, timeouts, cooperative cancellation, bounded retry, result
//! delivery, and graceful shutdown.
//!
//! # High-Level API
//!
//! For most use cases, the [`pool`] module is the entry point:
//!
//! ```ignore
//! use jobforge::pool::{JobMetadata, PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::new(4, 64));
//!
//! pool.submit(JobMetadata::new(1, "greet"), || {
//!     println!("hello from a worker");
//!     Ok(())
//! });
//!
//! let future = pool.submit_with_result(JobMetadata::new(2, "compute"), || Ok(42));
//! let answer = future.wait()?;
//!
//! pool.shutdown(std::time::Duration::from_secs(5));
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod pool;

/// Version of the JobForge library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
