//! Tracing instrumentation for local runs.
//!
//! Helpers for creating spans around a run, each pipeline cycle, and script
//! execution, plus recording functions that log through `tracing` and, with
//! the `metrics` feature, update the Prometheus collectors in
//! [`crate::metrics`].
//!
//! # Example
//!
//! ```ignore
//! use shardrun::telemetry::{run_span, record_run_start, record_run_end};
//!
//! let span = run_span(run_id, "order-sync", "simple", 1);
//! let _enter = span.enter();
//! let timing = record_run_start(run_id);
//! // ... run the job
//! record_run_end(timing, "simple", "success");
//! ```

use std::time::{Duration, Instant};

use tracing::{info_span, Span};

/// Create a span covering one whole local run.
#[must_use]
pub fn run_span(
    run_id: impl AsRef<str>,
    job_name: impl AsRef<str>,
    job_kind: impl AsRef<str>,
    sharding_item: u32,
) -> Span {
    info_span!(
        "shardrun.run",
        run_id = %run_id.as_ref(),
        job_name = %job_name.as_ref(),
        job_kind = %job_kind.as_ref(),
        sharding_item = sharding_item,
    )
}

/// Create a span for one fetch/process cycle of a pipeline job.
#[must_use]
pub fn cycle_span(job_name: impl AsRef<str>, cycle: u64) -> Span {
    info_span!(
        "shardrun.cycle",
        job_name = %job_name.as_ref(),
        cycle = cycle,
    )
}

/// Create a span for a script child process.
#[must_use]
pub fn script_span(program: impl AsRef<str>) -> Span {
    info_span!("shardrun.script", program = %program.as_ref())
}

/// Record the outcome of a run.
///
/// `status` is `success` or one of the error kinds.
pub fn record_run_completed(job_kind: impl AsRef<str>, status: impl AsRef<str>) {
    tracing::info!(
        job_kind = %job_kind.as_ref(),
        status = %status.as_ref(),
        "run completed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_run_completed(job_kind.as_ref(), status.as_ref());
}

/// Record the size of a processed pipeline batch.
pub fn record_items_processed(job_name: impl AsRef<str>, count: usize) {
    tracing::debug!(
        job_name = %job_name.as_ref(),
        count = count,
        "items processed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_items_processed(job_name.as_ref(), count as f64);
}

/// Observe the duration of a run.
pub fn observe_run_duration(
    job_kind: impl AsRef<str>,
    status: impl AsRef<str>,
    duration_secs: f64,
) {
    tracing::debug!(
        job_kind = %job_kind.as_ref(),
        status = %status.as_ref(),
        duration_secs = duration_secs,
        "run duration observed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::observe_run_duration(job_kind.as_ref(), status.as_ref(), duration_secs);
}

/// Start timing a run. Pass the handle to [`record_run_end`].
pub fn record_run_start(run_id: impl AsRef<str>) -> RunTimingHandle {
    RunTimingHandle {
        run_id: run_id.as_ref().to_string(),
        start: Instant::now(),
    }
}

/// Finish timing a run, record its outcome and duration, and return the elapsed time.
pub fn record_run_end(
    handle: RunTimingHandle,
    job_kind: impl AsRef<str>,
    status: impl AsRef<str>,
) -> Duration {
    let elapsed = handle.start.elapsed();
    record_run_completed(job_kind.as_ref(), status.as_ref());
    observe_run_duration(job_kind, status, elapsed.as_secs_f64());
    elapsed
}

/// Opaque timing handle returned by [`record_run_start`].
#[derive(Debug)]
pub struct RunTimingHandle {
    run_id: String,
    start: Instant,
}

impl RunTimingHandle {
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_name(make: impl FnOnce() -> Span) -> Option<&'static str> {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            make().metadata().map(|m| m.name())
        })
    }

    #[test]
    fn test_run_span() {
        let name = span_name(|| run_span("run-1", "demo", "simple", 0));
        assert_eq!(name, Some("shardrun.run"));
    }

    #[test]
    fn test_cycle_span() {
        let name = span_name(|| cycle_span("demo", 3));
        assert_eq!(name, Some("shardrun.cycle"));
    }

    #[test]
    fn test_script_span() {
        let name = span_name(|| script_span("/bin/true"));
        assert_eq!(name, Some("shardrun.script"));
    }

    #[test]
    fn test_timing_handle() {
        let handle = record_run_start("run-1");
        assert_eq!(handle.run_id(), "run-1");

        std::thread::sleep(Duration::from_millis(1));
        assert!(handle.elapsed().as_nanos() > 0);

        let elapsed = record_run_end(handle, "simple", "success");
        assert!(elapsed >= Duration::from_millis(1));
    }
}
