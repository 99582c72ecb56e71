//! Metrics for job execution observability.
//!
//! The pool emits counter, gauge, and histogram updates through a sink
//! abstraction. The pool doesn't know how updates are consumed. This follows
//! the "emit, don't present" pattern: an external exposer (Prometheus
//! endpoint, dashboard, log scraper) decides how to surface the numbers.
//!
//! Metric names are stable; an exposer may rename them but the identifiers
//! here are the contract.
//!
//! # Example
//!
//! ```ignore
//! use jobforge::metrics::{Counter, MetricsSink};
//!
//! struct LoggingSink;
//!
//! impl MetricsSink for LoggingSink {
//!     fn inc(&self, counter: Counter) {
//!         tracing::info!(metric = counter.name(), "counter incremented");
//!     }
//!     fn set(&self, gauge: jobforge::metrics::Gauge, value: i64) {}
//!     fn observe(&self, histogram: jobforge::metrics::Histogram, value: f64) {}
//! }
//! ```

mod in_memory;

pub use in_memory::{HistogramSnapshot, InMemoryMetricsSink, MetricsSnapshot, LATENCY_BUCKETS};

use std::sync::Arc;

// =============================================================================
// Metric Identifiers
// =============================================================================

/// Monotonically increasing counters maintained by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Jobs accepted by the queue (rejected submissions are not counted).
    JobsSubmitted,
    /// Jobs that completed normally, including jobs that succeeded after retries.
    JobsCompleted,
    /// Jobs with a failure terminal: task errors past the retry budget,
    /// timeouts, and pre-execution cancellations.
    JobsFailed,
}

impl Counter {
    /// Stable exposer-facing name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobsSubmitted => "jobs_submitted_total",
            Self::JobsCompleted => "jobs_completed_total",
            Self::JobsFailed => "jobs_failed_total",
        }
    }
}

/// Point-in-time gauges maintained by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gauge {
    /// Submitted jobs that have not yet reached a terminal outcome.
    ActiveJobs,
}

impl Gauge {
    /// Stable exposer-facing name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ActiveJobs => "active_jobs",
        }
    }
}

/// Distributions maintained by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Histogram {
    /// Execution latency in seconds of jobs that completed normally.
    JobLatencySeconds,
}

impl Histogram {
    /// Stable exposer-facing name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobLatencySeconds => "job_latency_seconds",
        }
    }
}

// =============================================================================
// Metrics Sink Trait
// =============================================================================

/// Sink for metric updates.
///
/// Implement this trait to receive metric updates from the pool. The pool is
/// handed a sink at construction; tests typically supply an
/// [`InMemoryMetricsSink`] and assert on its snapshot.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (`Send + Sync`); updates arrive from
/// every worker thread. Methods should be fast and non-blocking.
pub trait MetricsSink: Send + Sync {
    /// Increment a counter by one.
    fn inc(&self, counter: Counter);

    /// Set a gauge to an absolute value.
    fn set(&self, gauge: Gauge, value: i64);

    /// Record one sample into a histogram.
    fn observe(&self, histogram: Histogram, value: f64);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// No-op sink for when metrics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn inc(&self, _counter: Counter) {}
    fn set(&self, _gauge: Gauge, _value: i64) {}
    fn observe(&self, _histogram: Histogram, _value: f64) {}
}

/// Sink that logs updates using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn inc(&self, counter: Counter) {
        tracing::trace!(metric = counter.name(), "counter incremented");
    }

    fn set(&self, gauge: Gauge, value: i64) {
        tracing::trace!(metric = gauge.name(), value, "gauge set");
    }

    fn observe(&self, histogram: Histogram, value: f64) {
        tracing::trace!(metric = histogram.name(), value, "histogram sample");
    }
}

/// Sink that forwards updates to multiple sinks.
pub struct MultiplexMetricsSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl MultiplexMetricsSink {
    /// Creates a new multiplex sink with the given sinks.
    pub fn new(sinks: Vec<Arc<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink to the multiplex.
    pub fn add_sink(&mut self, sink: Arc<dyn MetricsSink>) {
        self.sinks.push(sink);
    }
}

impl MetricsSink for MultiplexMetricsSink {
    fn inc(&self, counter: Counter) {
        for sink in &self.sinks {
            sink.inc(counter);
        }
    }

    fn set(&self, gauge: Gauge, value: i64) {
        for sink in &self.sinks {
            sink.set(gauge, value);
        }
    }

    fn observe(&self, histogram: Histogram, value: f64) {
        for sink in &self.sinks {
            sink.observe(histogram, value);
        }
    }
}

impl std::fmt::Debug for MultiplexMetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexMetricsSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
