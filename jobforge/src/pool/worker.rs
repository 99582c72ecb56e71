//! Worker thread loop: dequeue, execute, enforce timeout, retry, account.
//!
//! Each worker parks in the queue's blocking `pop` and exits on the
//! [`Popped::Closed`] sentinel. Timeout enforcement moves the task into an
//! inner thread for the duration of the attempt: the worker waits on a
//! deadline slot, and on expiry sets the cancel flag and drops the join
//! handle. The orphaned task keeps running until it returns or polls the
//! flag; it can no longer complete the result handle (the write-once slot
//! swallows late completions) or touch the counters.

use super::core::PoolShared;
use super::queue::{JobQueue, Popped};
use super::task::{Job, TaskError, TaskFn};
use crate::metrics::{Counter, Histogram};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of one execution attempt, together with whatever survived it.
struct Attempt {
    outcome: Outcome,
    /// The task closure, recovered for a possible retry. `None` when the
    /// attempt timed out (the closure is orphaned) or the inner thread was
    /// lost.
    task: Option<TaskFn>,
}

enum Outcome {
    Completed { elapsed: Duration },
    Failed(TaskError),
    TimedOut,
}

/// Main loop for one worker thread.
pub(crate) fn worker_loop(id: usize, queue: Arc<JobQueue>, shared: Arc<PoolShared>) {
    debug!(worker = id, "worker started");
    loop {
        match queue.pop() {
            Popped::Job(job) => execute_job(job, &queue, &shared),
            Popped::Closed => break,
        }
    }
    debug!(worker = id, "worker stopped");
}

fn execute_job(job: Job, queue: &JobQueue, shared: &PoolShared) {
    // Rejected before execution: a pre-set cancel flag means the task never runs.
    if job.meta.is_cancel_requested() {
        debug!(job_id = job.meta.id, name = %job.meta.name, "job cancelled before execution");
        job.notify_abandoned(TaskError::Cancelled);
        shared.metrics.inc(Counter::JobsFailed);
        shared.job_finished();
        return;
    }

    let Job {
        mut meta,
        task,
        abandon,
    } = job;

    debug!(
        job_id = meta.id,
        name = %meta.name,
        priority = meta.priority,
        queued_ms = meta.submitted_at.elapsed().as_millis(),
        "job dequeued"
    );

    let start = Instant::now();
    let attempt = if meta.timeout.is_zero() {
        run_inline(task, start)
    } else {
        run_with_deadline(task, &meta, start)
    };

    match attempt.outcome {
        Outcome::Completed { elapsed } => {
            debug!(
                job_id = meta.id,
                name = %meta.name,
                elapsed_ms = elapsed.as_millis(),
                "job completed"
            );
            shared.metrics.inc(Counter::JobsCompleted);
            shared
                .metrics
                .observe(Histogram::JobLatencySeconds, elapsed.as_secs_f64());
        }
        Outcome::TimedOut => {
            warn!(
                job_id = meta.id,
                name = %meta.name,
                timeout_ms = meta.timeout.as_millis(),
                "job timed out; cancellation requested"
            );
            if let Some(hook) = &abandon {
                hook(TaskError::TimedOut);
            }
            shared.metrics.inc(Counter::JobsFailed);
        }
        Outcome::Failed(error) => {
            let retryable = meta.allow_retry
                && !meta.is_cancel_requested()
                && meta.current_retry < meta.max_retries;

            if retryable {
                if let Some(task) = attempt.task {
                    meta.current_retry += 1;
                    warn!(
                        job_id = meta.id,
                        name = %meta.name,
                        attempt = meta.current_retry,
                        max_retries = meta.max_retries,
                        error = %error,
                        "job failed; requeueing for retry"
                    );
                    let job_id = meta.id;
                    let mut job = Job::new(meta, task);
                    job.abandon = abandon;
                    // The retried job keeps its original priority; it joins
                    // the back of its priority class.
                    if queue.push(job) {
                        return;
                    }
                    warn!(job_id, "retry rejected: queue is shut down");
                    shared.metrics.inc(Counter::JobsFailed);
                    shared.job_finished();
                    return;
                }
            }

            warn!(
                job_id = meta.id,
                name = %meta.name,
                retries = meta.current_retry,
                error = %error,
                "job failed"
            );
            shared.metrics.inc(Counter::JobsFailed);
        }
    }

    shared.job_finished();
}

/// Runs the task on the worker thread itself. Used when no timeout is set.
fn run_inline(mut task: TaskFn, start: Instant) -> Attempt {
    let outcome = match run_task(&mut task) {
        Ok(()) => Outcome::Completed {
            elapsed: start.elapsed(),
        },
        Err(error) => Outcome::Failed(error),
    };
    Attempt {
        outcome,
        task: Some(task),
    }
}

/// Slot the inner thread publishes its result into; the worker waits on it
/// with a deadline.
#[derive(Default)]
struct DeadlineSlot {
    result: Mutex<Option<Result<(), TaskError>>>,
    done: Condvar,
}

impl DeadlineSlot {
    fn publish(&self, result: Result<(), TaskError>) {
        *self.result.lock().unwrap() = Some(result);
        self.done.notify_one();
    }

    /// Waits up to `timeout` for a published result.
    fn wait(&self, timeout: Duration) -> Option<Result<(), TaskError>> {
        let guard = self.result.lock().unwrap();
        let (mut guard, _timed_out) = self
            .done
            .wait_timeout_while(guard, timeout, |slot| slot.is_none())
            .unwrap();
        guard.take()
    }
}

/// Runs the task in an inner thread and waits up to the job's timeout.
///
/// On expiry the cancel flag is set and the inner thread is detached; the
/// task must poll the flag to stop early, otherwise it runs to completion
/// orphaned.
fn run_with_deadline(task: TaskFn, meta: &super::JobMetadata, start: Instant) -> Attempt {
    let slot = Arc::new(DeadlineSlot::default());
    let publisher = Arc::clone(&slot);

    let handle = thread::Builder::new()
        .name(format!("{}-deadline", meta.name))
        .spawn(move || {
            let mut task = task;
            let result = run_task(&mut task);
            publisher.publish(result);
            task
        })
        .expect("failed to spawn deadline thread");

    match slot.wait(meta.timeout) {
        Some(result) => {
            // Finished in time; the thread is done or about to be, so the
            // join is brief and recovers the closure for retry.
            let task = handle.join().ok();
            let outcome = match result {
                Ok(()) => Outcome::Completed {
                    elapsed: start.elapsed(),
                },
                Err(error) => Outcome::Failed(error),
            };
            Attempt { outcome, task }
        }
        None => {
            meta.request_cancel();
            drop(handle);
            Attempt {
                outcome: Outcome::TimedOut,
                task: None,
            }
        }
    }
}

/// Invokes the task, converting panics into [`TaskError::Panicked`].
fn run_task(task: &mut TaskFn) -> Result<(), TaskError> {
    match panic::catch_unwind(AssertUnwindSafe(|| task())) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
