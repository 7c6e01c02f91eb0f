//! Prometheus metrics for local runs.
//!
//! Compiled only with the `metrics` feature.
//!
//! # Metrics
//!
//! ## Counters
//! - `shardrun_runs_total` - Runs finished, by job kind and status
//! - `shardrun_pipeline_items_total` - Work items handed to pipeline process steps
//!
//! ## Histograms
//! - `shardrun_run_duration_seconds` - Wall-clock duration of a run
#![cfg(feature = "metrics")]

use prometheus::{exponential_buckets, CounterVec, HistogramVec, Opts, Registry};
use std::sync::LazyLock;

/// Global Prometheus registry for shardrun metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Counter for finished runs.
///
/// Labels:
/// - `job_kind`: simple, pipeline, or script
/// - `status`: success, configuration, resolution, or execution
pub static RUNS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new("shardrun_runs_total", "Total number of local runs finished");
    CounterVec::new(opts, &["job_kind", "status"])
        .expect("shardrun_runs_total metric creation failed")
});

/// Counter for items passed to pipeline process steps.
///
/// Labels:
/// - `job_name`: The job name
pub static PIPELINE_ITEMS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "shardrun_pipeline_items_total",
        "Total number of work items processed by pipeline jobs",
    );
    CounterVec::new(opts, &["job_name"])
        .expect("shardrun_pipeline_items_total metric creation failed")
});

/// Histogram for run duration in seconds.
///
/// Labels:
/// - `job_kind`: simple, pipeline, or script
/// - `status`: success or the error kind
pub static RUN_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let buckets = exponential_buckets(0.001, 2.0, 15).expect("bucket creation failed");
    let opts = prometheus::HistogramOpts::new(
        "shardrun_run_duration_seconds",
        "Local run duration in seconds",
    )
    .buckets(buckets);
    HistogramVec::new(opts, &["job_kind", "status"])
        .expect("shardrun_run_duration_seconds metric creation failed")
});

/// Register all collectors with [`REGISTRY`]. Safe to call more than once.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for metric in [
        Box::new(RUNS_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(PIPELINE_ITEMS_TOTAL.clone()),
        Box::new(RUN_DURATION_SECONDS.clone()),
    ] {
        if let Err(e) = registry.register(metric) {
            let msg = e.to_string();
            if !msg.contains("Duplicate metrics collector registration attempted") {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

pub fn record_run_completed(job_kind: &str, status: &str) {
    RUNS_TOTAL.with_label_values(&[job_kind, status]).inc();
}

pub fn record_items_processed(job_name: &str, count: f64) {
    PIPELINE_ITEMS_TOTAL
        .with_label_values(&[job_name])
        .inc_by(count);
}

pub fn observe_run_duration(job_kind: &str, status: &str, duration_secs: f64) {
    RUN_DURATION_SECONDS
        .with_label_values(&[job_kind, status])
        .observe(duration_secs);
}

/// Gather all registered metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(Into::into)
}
