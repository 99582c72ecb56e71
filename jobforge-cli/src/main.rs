//! JobForge CLI - Command-line interface
//!
//! This binary drives the JobForge worker pool with a demonstration
//! workload: a batch of logging jobs, one result-returning job awaited via
//! its future, and an optional flaky job that exercises the retry path.
//!
//! # Configuration
//!
//! Settings are loaded from `~/.jobforge/config.ini` on startup.
//! CLI arguments override config file values when specified.
//!
//! Exit code is 0 on clean shutdown and 1 on invalid configuration.

mod error;

use clap::Parser;
use error::CliError;
use jobforge::config::ConfigFile;
use jobforge::metrics::{InMemoryMetricsSink, MetricsSink};
use jobforge::pool::{JobMetadata, PoolConfig, ShutdownOutcome, TaskError, WorkerPool};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// ============================================================================
// CLI Argument Definitions
// ============================================================================

#[derive(Parser)]
#[command(name = "jobforge")]
#[command(version = jobforge::VERSION)]
#[command(about = "Multithreaded job execution engine", long_about = None)]
struct Cli {
    /// Number of worker threads (default: from config)
    #[arg(long)]
    threads: Option<usize>,

    /// Queue capacity; producers block when full (default: from config)
    #[arg(long)]
    max_queue: Option<usize>,

    /// Shutdown drain deadline in seconds (default: from config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Per-job timeout in seconds, 0 disables (default: from config)
    #[arg(long)]
    job_timeout: Option<u64>,

    /// Also submit a flaky job that fails twice before succeeding
    #[arg(long)]
    test_retry: bool,

    /// Alternate configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Settings after merging CLI flags over the config file.
struct Resolved {
    pool: PoolConfig,
    job_timeout: Duration,
    shutdown_deadline: Duration,
}

fn resolve(cli: &Cli) -> Result<Resolved, CliError> {
    let config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let threads = cli.threads.unwrap_or(config.pool.threads);
    let max_queue = cli.max_queue.unwrap_or(config.pool.max_queue);

    if threads == 0 {
        return Err(CliError::Config("--threads must be at least 1".to_string()));
    }
    if max_queue == 0 {
        return Err(CliError::Config(
            "--max-queue must be at least 1".to_string(),
        ));
    }

    Ok(Resolved {
        pool: PoolConfig::new(threads, max_queue),
        job_timeout: Duration::from_secs(cli.job_timeout.unwrap_or(config.jobs.timeout_secs)),
        shutdown_deadline: Duration::from_secs(
            cli.timeout.unwrap_or(config.shutdown.deadline_secs),
        ),
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        e.exit();
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let resolved = resolve(cli)?;

    let _logging_guard = jobforge::logging::init_logging(
        jobforge::logging::DEFAULT_LOG_DIR,
        jobforge::logging::DEFAULT_LOG_FILE,
    )
    .map_err(CliError::LoggingInit)?;

    info!(version = jobforge::VERSION, "JobForge starting");

    let metrics = Arc::new(InMemoryMetricsSink::new());
    let pool = WorkerPool::with_metrics(resolved.pool, Arc::clone(&metrics) as Arc<dyn MetricsSink>);

    run_demo(&pool, &resolved, cli.test_retry);

    let outcome = pool.shutdown(resolved.shutdown_deadline);
    print_summary(&metrics, outcome);

    Ok(())
}

// ============================================================================
// Demo Workload
// ============================================================================

fn run_demo(pool: &WorkerPool, resolved: &Resolved, test_retry: bool) {
    // A batch of fire-and-forget jobs.
    for i in 0..10 {
        let meta = JobMetadata::new(i, format!("log-job-{i}")).with_timeout(resolved.job_timeout);
        pool.submit(meta, move || {
            info!(job = i, "running job");
            Ok(())
        });
    }

    if test_retry {
        // Fails on the first two attempts, succeeds on the third.
        let attempts = Arc::new(AtomicU32::new(0));
        let meta = JobMetadata::new(100, "flaky-job").with_max_retries(3);
        pool.submit(meta, move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                Err(TaskError::failed(format!("flaky attempt {attempt}")))
            } else {
                info!(attempt, "flaky job finally succeeded");
                Ok(())
            }
        });
    }

    // A job returning a result through a future.
    let future = pool.submit_with_result(JobMetadata::new(200, "compute-answer"), || {
        std::thread::sleep(Duration::from_millis(500));
        info!("computing result...");
        Ok(42)
    });

    info!("waiting for result...");
    match future.wait() {
        Ok(result) => info!(result, "result received"),
        Err(error) => info!(%error, "result job failed"),
    }
}

fn print_summary(metrics: &InMemoryMetricsSink, outcome: ShutdownOutcome) {
    let snapshot = metrics.snapshot();
    println!();
    println!("Shutdown: {:?}", outcome);
    println!(
        "Jobs: {} submitted, {} completed, {} failed, {} active",
        snapshot.submitted, snapshot.completed, snapshot.failed, snapshot.active_jobs
    );
    println!(
        "Latency: {} samples, {:.3}s total",
        snapshot.latency.count, snapshot.latency.sum_seconds
    );
}
