//! End-to-end worker pool scenarios.
//!
//! These tests drive the public API the way an embedding application would:
//! real worker threads, an in-memory metrics sink, and wall-clock timing
//! with generous margins.

use jobforge::metrics::{InMemoryMetricsSink, MetricsSink};
use jobforge::pool::{JobMetadata, PoolConfig, ShutdownOutcome, TaskError, WorkerPool};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn pool_with_metrics(threads: usize, max_queue: usize) -> (WorkerPool, Arc<InMemoryMetricsSink>) {
    let metrics = Arc::new(InMemoryMetricsSink::new());
    let pool = WorkerPool::with_metrics(
        PoolConfig::new(threads, max_queue),
        Arc::clone(&metrics) as Arc<dyn MetricsSink>,
    );
    (pool, metrics)
}

#[test]
fn basic_submit_completes_all_jobs() {
    let (pool, metrics) = pool_with_metrics(2, 10);

    for i in 0..5 {
        assert!(pool.submit(JobMetadata::new(i, format!("noop-{i}")), || Ok(())));
    }

    assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownOutcome::Clean);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 5);
    assert_eq!(snapshot.completed, 5);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.active_jobs, 0);
    assert_eq!(snapshot.latency.count, 5);
}

#[test]
fn higher_priority_jobs_run_first() {
    let (pool, _metrics) = pool_with_metrics(1, 10);
    let order = Arc::new(Mutex::new(Vec::new()));

    // Occupy the single worker so the next submissions pile up in the queue.
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(JobMetadata::new(0, "blocker"), move || {
        release_rx.recv().ok();
        Ok(())
    });
    std::thread::sleep(Duration::from_millis(100));

    for (id, priority) in [(1, 1), (2, 5), (3, 9)] {
        let order = Arc::clone(&order);
        pool.submit(
            JobMetadata::new(id, format!("prio-{priority}")).with_priority(priority),
            move || {
                order.lock().unwrap().push(priority);
                Ok(())
            },
        );
    }

    release_tx.send(()).unwrap();
    assert_eq!(pool.shutdown(Duration::from_secs(5)), ShutdownOutcome::Clean);

    assert_eq!(*order.lock().unwrap(), vec![9, 5, 1]);
}

#[test]
fn equal_priorities_run_in_submission_order() {
    let (pool, _metrics) = pool_with_metrics(1, 10);
    let order = Arc::new(Mutex::new(Vec::new()));

    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(JobMetadata::new(0, "blocker"), move || {
        release_rx.recv().ok();
        Ok(())
    });
    std::thread::sleep(Duration::from_millis(100));

    for id in 1..=4 {
        let order = Arc::clone(&order);
        pool.submit(JobMetadata::new(id, "same-prio").with_priority(3), move || {
            order.lock().unwrap().push(id);
            Ok(())
        });
    }

    release_tx.send(()).unwrap();
    pool.shutdown(Duration::from_secs(5));

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn retry_budget_is_spent_then_job_fails() {
    let (pool, metrics) = pool_with_metrics(2, 10);
    let executions = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&executions);
    pool.submit(
        JobMetadata::new(1, "always-fails").with_max_retries(2),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::failed("persistent failure"))
        },
    );

    pool.shutdown(Duration::from_secs(5));

    // max_retries = 2 means the body runs 1 + 2 times.
    assert_eq!(executions.load(Ordering::SeqCst), 3);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.completed, 0);
    assert_eq!(snapshot.active_jobs, 0);
}

#[test]
fn job_succeeding_after_retries_counts_completed_once() {
    let (pool, metrics) = pool_with_metrics(2, 10);
    let executions = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&executions);
    pool.submit(
        JobMetadata::new(1, "flaky").with_max_retries(3),
        move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                Err(TaskError::failed(format!("attempt {attempt}")))
            } else {
                Ok(())
            }
        },
    );

    pool.shutdown(Duration::from_secs(5));

    assert_eq!(executions.load(Ordering::SeqCst), 3);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.failed, 0);
}

#[test]
fn panicking_task_is_retried_then_counted_failed() {
    let (pool, metrics) = pool_with_metrics(1, 10);
    let executions = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&executions);
    pool.submit(
        JobMetadata::new(1, "panics").with_max_retries(1),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("task blew up");
        },
    );

    pool.shutdown(Duration::from_secs(5));

    assert_eq!(executions.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.snapshot().failed, 1);
}

#[test]
fn timed_out_job_is_failed_cancelled_and_unsampled() {
    let (pool, metrics) = pool_with_metrics(1, 10);

    let meta =
        JobMetadata::new(1, "too-slow").with_timeout(Duration::from_millis(100));
    let token = meta.cancel_token();

    let body_token = meta.cancel_token();
    pool.submit(meta, move || {
        // Sleep ~500ms total, polling the cancel flag between naps.
        for _ in 0..50 {
            if body_token.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    });

    pool.shutdown(Duration::from_secs(5));

    assert!(token.is_cancelled());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.completed, 0);
    // Latency is sampled only for normal completions.
    assert_eq!(snapshot.latency.count, 0);
    assert_eq!(snapshot.active_jobs, 0);
}

#[test]
fn task_that_never_polls_cancellation_still_times_out() {
    let (pool, metrics) = pool_with_metrics(1, 10);

    pool.submit(
        JobMetadata::new(1, "oblivious").with_timeout(Duration::from_millis(50)),
        || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        },
    );

    pool.shutdown(Duration::from_secs(5));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.completed, 0);
    assert_eq!(snapshot.active_jobs, 0);
}

#[test]
fn precancelled_job_never_executes() {
    let (pool, metrics) = pool_with_metrics(1, 10);
    let executed = Arc::new(AtomicU32::new(0));

    // Occupy the worker so we can cancel the queued job before it starts.
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(JobMetadata::new(0, "blocker"), move || {
        release_rx.recv().ok();
        Ok(())
    });
    std::thread::sleep(Duration::from_millis(100));

    let meta = JobMetadata::new(1, "doomed");
    let token = meta.cancel_token();
    let flag = Arc::clone(&executed);
    pool.submit(meta, move || {
        flag.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    token.cancel();
    release_tx.send(()).unwrap();
    pool.shutdown(Duration::from_secs(5));

    assert_eq!(executed.load(Ordering::SeqCst), 0);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 2);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.active_jobs, 0);
}

#[test]
fn result_future_delivers_value() {
    let (pool, _metrics) = pool_with_metrics(2, 10);

    let future = pool.submit_with_result(JobMetadata::new(1, "answer"), || Ok(6 * 7));
    assert_eq!(future.wait(), Ok(42));

    pool.shutdown(Duration::from_secs(5));
}

#[test]
fn result_future_propagates_task_error() {
    let (pool, metrics) = pool_with_metrics(2, 10);

    let future = pool.submit_with_result(JobMetadata::new(1, "doomed"), || {
        Err::<i32, _>(TaskError::failed("no answer"))
    });
    assert_eq!(future.wait(), Err(TaskError::failed("no answer")));

    pool.shutdown(Duration::from_secs(5));
    assert_eq!(metrics.snapshot().failed, 1);
}

#[test]
fn result_jobs_never_retry() {
    let (pool, _metrics) = pool_with_metrics(1, 10);
    let executions = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&executions);
    // A retry budget is requested but must be ignored for result jobs.
    let future = pool.submit_with_result(
        JobMetadata::new(1, "no-retry").with_max_retries(5),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<i32, _>(TaskError::failed("once only"))
        },
    );

    assert!(future.wait().is_err());
    pool.shutdown(Duration::from_secs(5));
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_deadline_forces_but_still_joins() {
    let (pool, metrics) = pool_with_metrics(2, 16);

    for i in 0..10 {
        pool.submit(JobMetadata::new(i, format!("slow-{i}")), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        });
    }

    // Ten 300ms jobs on two threads need ~1.5s; a 1s deadline must trip.
    let outcome = pool.shutdown(Duration::from_secs(1));
    assert_eq!(outcome, ShutdownOutcome::Forced);

    // Workers were joined after finishing their jobs; accounting is settled.
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.active_jobs, 0);
    assert_eq!(snapshot.submitted, 10);
    assert_eq!(
        snapshot.completed + snapshot.failed,
        snapshot.submitted
    );
}

#[test]
fn shutdown_is_idempotent() {
    let (pool, metrics) = pool_with_metrics(2, 8);
    pool.submit(JobMetadata::new(1, "noop"), || Ok(()));

    let first = pool.shutdown(Duration::from_secs(5));
    let second = pool.shutdown(Duration::from_secs(5));

    assert_eq!(first, ShutdownOutcome::Clean);
    assert_eq!(second, first);
    assert_eq!(metrics.snapshot().completed, 1);
}

#[test]
fn submissions_after_shutdown_are_not_counted() {
    let (pool, metrics) = pool_with_metrics(2, 8);
    pool.shutdown(Duration::from_secs(5));

    assert!(!pool.submit(JobMetadata::new(1, "late"), || Ok(())));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 0);
    assert_eq!(snapshot.active_jobs, 0);
}

#[test]
fn steady_state_accounting_balances() {
    let (pool, metrics) = pool_with_metrics(4, 32);

    for i in 0..20 {
        if i % 5 == 0 {
            pool.submit(JobMetadata::new(i, "failing"), || {
                Err(TaskError::failed("expected"))
            });
        } else {
            pool.submit(JobMetadata::new(i, "fine"), || Ok(()));
        }
    }

    pool.shutdown(Duration::from_secs(5));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.submitted, 20);
    assert_eq!(snapshot.completed + snapshot.failed, 20);
    assert_eq!(snapshot.failed, 4);
    assert_eq!(snapshot.active_jobs, 0);
}
