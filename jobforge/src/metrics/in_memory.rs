//! Lock-free in-memory metrics sink.
//!
//! Uses `AtomicU64`/`AtomicI64` for thread-safe collection without locks.
//! All operations use `Relaxed` ordering: the counters are independent
//! measurements and don't need ordering between each other.

use super::{Counter, Gauge, Histogram, MetricsSink};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Upper bounds (seconds) of the job latency histogram buckets.
///
/// An implicit +Inf bucket catches samples above the last bound.
pub const LATENCY_BUCKETS: [f64; 7] = [0.01, 0.05, 0.1, 0.3, 0.5, 1.0, 2.0];

/// In-memory metrics sink backed by atomics.
///
/// Intended for tests and for embedding into an external exposer: the
/// pool writes through the [`MetricsSink`] interface and the owner reads
/// a consistent-enough [`MetricsSnapshot`] whenever it wants.
#[derive(Debug)]
pub struct InMemoryMetricsSink {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    active_jobs: AtomicI64,
    /// Per-bucket sample counts; the last slot is the +Inf bucket.
    latency_buckets: [AtomicU64; LATENCY_BUCKETS.len() + 1],
    latency_count: AtomicU64,
    /// Sum of samples in microseconds, to stay on integer atomics.
    latency_sum_us: AtomicU64,
}

impl Default for InMemoryMetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetricsSink {
    /// Creates a sink with all metrics at zero.
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            active_jobs: AtomicI64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_count: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
        }
    }

    /// Returns a point-in-time copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let buckets = LATENCY_BUCKETS
            .iter()
            .copied()
            .map(Some)
            .chain(std::iter::once(None))
            .zip(self.latency_buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            latency: HistogramSnapshot {
                buckets,
                count: self.latency_count.load(Ordering::Relaxed),
                sum_seconds: self.latency_sum_us.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            },
        }
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn inc(&self, counter: Counter) {
        let cell = match counter {
            Counter::JobsSubmitted => &self.submitted,
            Counter::JobsCompleted => &self.completed,
            Counter::JobsFailed => &self.failed,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    fn set(&self, gauge: Gauge, value: i64) {
        match gauge {
            Gauge::ActiveJobs => self.active_jobs.store(value, Ordering::Relaxed),
        }
    }

    fn observe(&self, histogram: Histogram, value: f64) {
        match histogram {
            Histogram::JobLatencySeconds => {
                let slot = LATENCY_BUCKETS
                    .iter()
                    .position(|bound| value <= *bound)
                    .unwrap_or(LATENCY_BUCKETS.len());
                self.latency_buckets[slot].fetch_add(1, Ordering::Relaxed);
                self.latency_count.fetch_add(1, Ordering::Relaxed);
                self.latency_sum_us
                    .fetch_add((value * 1_000_000.0) as u64, Ordering::Relaxed);
            }
        }
    }
}

/// Point-in-time copy of every metric the sink tracks.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// `jobs_submitted_total`.
    pub submitted: u64,
    /// `jobs_completed_total`.
    pub completed: u64,
    /// `jobs_failed_total`.
    pub failed: u64,
    /// `active_jobs`.
    pub active_jobs: i64,
    /// `job_latency_seconds`.
    pub latency: HistogramSnapshot,
}

/// Copy of the latency histogram.
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    /// Per-bucket (non-cumulative) sample counts; `None` bound is +Inf.
    pub buckets: Vec<(Option<f64>, u64)>,
    /// Total number of samples.
    pub count: u64,
    /// Sum of all samples in seconds.
    pub sum_seconds: f64,
}
