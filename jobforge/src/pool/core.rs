//! The worker pool: submission, result delivery, and shutdown coordination.

use super::config::{PoolConfig, DEFAULT_SHUTDOWN_DEADLINE};
use super::future::JobFuture;
use super::metadata::JobMetadata;
use super::queue::JobQueue;
use super::task::{Job, TaskError};
use crate::metrics::{Counter, Gauge, MetricsSink, NullMetricsSink};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a shutdown ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight job reached a terminal outcome within the deadline.
    Clean,
    /// The deadline expired with jobs still in flight; shutdown proceeded
    /// anyway. Workers were still joined after finishing their current jobs.
    Forced,
}

/// State shared between the pool handle and its worker threads.
pub(crate) struct PoolShared {
    pub(crate) metrics: Arc<dyn MetricsSink>,
    /// Accepted jobs that have not yet reached a terminal outcome.
    in_progress: AtomicU64,
    running: AtomicBool,
    /// Parked on by the shutdown coordinator until `in_progress` hits zero.
    done_lock: Mutex<()>,
    all_done: Condvar,
}

impl PoolShared {
    fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            metrics,
            in_progress: AtomicU64::new(0),
            running: AtomicBool::new(true),
            done_lock: Mutex::new(()),
            all_done: Condvar::new(),
        }
    }

    /// Counts a job in before it becomes visible to workers. Paired with
    /// either `job_finished` (terminal outcome) or `job_withdrawn` (the
    /// enqueue was rejected).
    fn job_accepted(&self) {
        self.in_progress.fetch_add(1, Ordering::SeqCst);
    }

    fn job_withdrawn(&self) {
        self.decrement();
    }

    /// Records the single terminal outcome of an accepted job.
    pub(crate) fn job_finished(&self) {
        self.decrement();
        self.publish_active();
    }

    fn decrement(&self) {
        if self.in_progress.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Take the lock so a coordinator between its predicate check and
            // its park cannot miss this wakeup.
            let _guard = self.done_lock.lock().unwrap();
            self.all_done.notify_all();
        }
    }

    pub(crate) fn publish_active(&self) {
        self.metrics
            .set(Gauge::ActiveJobs, self.in_progress.load(Ordering::SeqCst) as i64);
    }

    fn active(&self) -> u64 {
        self.in_progress.load(Ordering::SeqCst)
    }
}

/// Fixed-size worker pool executing jobs from a shared bounded priority queue.
///
/// Workers enforce per-job timeout and cooperative cancellation, retry failed
/// tasks within their budget, and deliver results through [`JobFuture`]
/// handles. Metric updates flow into the [`MetricsSink`] supplied at
/// construction.
///
/// Dropping the pool triggers a shutdown with the default deadline if one
/// was not already performed.
///
/// # Example
///
/// ```ignore
/// use jobforge::pool::{JobMetadata, PoolConfig, WorkerPool};
///
/// let pool = WorkerPool::new(PoolConfig::new(4, 64));
/// let future = pool.submit_with_result(JobMetadata::new(1, "answer"), || Ok(6 * 7));
/// assert_eq!(future.wait(), Ok(42));
/// pool.shutdown(std::time::Duration::from_secs(5));
/// ```
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown_started: AtomicBool,
    shutdown_outcome: Mutex<Option<ShutdownOutcome>>,
}

impl WorkerPool {
    /// Creates a pool with metrics disabled.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_metrics(config, Arc::new(NullMetricsSink))
    }

    /// Creates a pool that reports through the given sink.
    ///
    /// Spawns exactly `config.threads` worker threads bound to one shared
    /// queue of capacity `config.max_queue`.
    pub fn with_metrics(config: PoolConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        let config = config.normalized();
        let queue = Arc::new(JobQueue::new(config.max_queue));
        let shared = Arc::new(PoolShared::new(metrics));

        let mut workers = Vec::with_capacity(config.threads);
        for id in 0..config.threads {
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("jobforge-worker-{id}"))
                .spawn(move || super::worker::worker_loop(id, queue, shared))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        info!(
            threads = config.threads,
            max_queue = config.max_queue,
            "worker pool started"
        );

        Self {
            queue,
            shared,
            workers: Mutex::new(workers),
            shutdown_started: AtomicBool::new(false),
            shutdown_outcome: Mutex::new(None),
        }
    }

    /// Submits a fire-and-forget job.
    ///
    /// Blocks while the queue is full (backpressure). Returns `true` if the
    /// job was accepted; once the pool is shutting down submissions are
    /// rejected and nothing is counted.
    pub fn submit<F>(&self, meta: JobMetadata, task: F) -> bool
    where
        F: FnMut() -> Result<(), TaskError> + Send + 'static,
    {
        self.submit_job(Job::new(meta, Box::new(task)))
    }

    /// Submits a job whose return value is delivered through a [`JobFuture`].
    ///
    /// Retry is forced off for this form: a retried task would complete the
    /// write-once result slot a second time. If the pool is already shutting
    /// down the returned future resolves immediately to
    /// [`TaskError::Rejected`].
    pub fn submit_with_result<R, F>(&self, mut meta: JobMetadata, task: F) -> JobFuture<R>
    where
        R: Send + 'static,
        F: FnOnce() -> Result<R, TaskError> + Send + 'static,
    {
        meta.allow_retry = false;

        let (future, writer) = JobFuture::pair();
        let abandon_writer = writer.clone();
        let mut task = Some(task);

        let job = Job::new(
            meta,
            Box::new(move || {
                // allow_retry is off, so this closure runs at most once.
                match task.take() {
                    Some(task) => match task() {
                        Ok(value) => {
                            writer.complete(Ok(value));
                            Ok(())
                        }
                        Err(error) => {
                            writer.complete(Err(error.clone()));
                            Err(error)
                        }
                    },
                    None => Err(TaskError::failed("result task already consumed")),
                }
            }),
        )
        .with_abandon_hook(Box::new(move |error| {
            abandon_writer.complete(Err(error));
        }));

        self.submit_job(job);
        future
    }

    fn submit_job(&self, mut job: Job) -> bool {
        job.meta.submitted_at = Instant::now();
        let job_id = job.meta.id;

        // Count the job in before it is visible to workers so the terminal
        // decrement can never precede the increment; withdraw on rejection.
        self.shared.job_accepted();
        if !self.queue.push(job) {
            self.shared.job_withdrawn();
            debug!(job_id, "submission rejected: pool is shut down");
            return false;
        }

        self.shared.metrics.inc(Counter::JobsSubmitted);
        self.shared.publish_active();
        true
    }

    /// Accepted jobs that have not yet reached a terminal outcome.
    pub fn active_jobs(&self) -> u64 {
        self.shared.active()
    }

    /// Number of jobs currently waiting in the queue.
    pub fn queued_jobs(&self) -> usize {
        self.queue.len()
    }

    /// True until shutdown begins.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Drains in-flight work and joins every worker thread.
    ///
    /// Waits up to `deadline` for all in-flight jobs (queued and running) to
    /// reach a terminal outcome. If the deadline expires a warning is logged
    /// and shutdown proceeds without waiting further: the queue is closed,
    /// parked workers wake, and each worker exits after finishing its
    /// current job. Jobs still queued at that point may or may not run.
    ///
    /// Idempotent: a second call is a no-op returning the first outcome.
    pub fn shutdown(&self, deadline: Duration) -> ShutdownOutcome {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            debug!("shutdown already performed");
            return self
                .shutdown_outcome
                .lock()
                .unwrap()
                .unwrap_or(ShutdownOutcome::Clean);
        }

        info!(
            in_flight = self.shared.active(),
            deadline_secs = deadline.as_secs_f64(),
            "shutdown started; waiting for in-flight jobs"
        );

        let guard = self.shared.done_lock.lock().unwrap();
        let (guard, wait_result) = self
            .shared
            .all_done
            .wait_timeout_while(guard, deadline, |_| self.shared.active() > 0)
            .unwrap();
        drop(guard);

        let outcome = if wait_result.timed_out() {
            warn!(
                remaining = self.shared.active(),
                "shutdown deadline reached; forcing shutdown"
            );
            ShutdownOutcome::Forced
        } else {
            ShutdownOutcome::Clean
        };

        self.shared.running.store(false, Ordering::SeqCst);
        self.queue.shutdown();

        let mut workers = self.workers.lock().unwrap();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }

        info!(outcome = ?outcome, "worker pool stopped");
        *self.shutdown_outcome.lock().unwrap() = Some(outcome);
        outcome
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.shutdown_started.load(Ordering::SeqCst) {
            self.shutdown(DEFAULT_SHUTDOWN_DEADLINE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_starts_and_stops() {
        let pool = WorkerPool::new(PoolConfig::new(2, 8));
        assert!(pool.is_running());
        assert_eq!(pool.active_jobs(), 0);

        assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownOutcome::Clean);
        assert!(!pool.is_running());
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(PoolConfig::new(1, 4));
        pool.shutdown(Duration::from_secs(5));

        assert!(!pool.submit(JobMetadata::new(1, "late"), || Ok(())));
        assert_eq!(pool.active_jobs(), 0);
    }

    #[test]
    fn test_result_submission_after_shutdown_resolves_rejected() {
        let pool = WorkerPool::new(PoolConfig::new(1, 4));
        pool.shutdown(Duration::from_secs(5));

        let future = pool.submit_with_result(JobMetadata::new(2, "late"), || Ok(1));
        assert_eq!(future.wait(), Err(TaskError::Rejected));
    }

    #[test]
    fn test_drop_shuts_down() {
        let pool = WorkerPool::new(PoolConfig::new(2, 8));
        pool.submit(JobMetadata::new(1, "noop"), || Ok(()));
        drop(pool);
        // Dropping joined the workers; nothing left to assert beyond no hang.
    }
}
