use tracing::debug;

use crate::context::ShardingContext;
use crate::error::ExecutionError;
use crate::registry::PipelineJob;
use crate::telemetry::{cycle_span, record_items_processed};

/// Counters collected while driving a pipeline job.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PipelineStats {
    pub fetches: u64,
    pub batches: u64,
    pub items_processed: u64,
}

/// Drive fetch/process cycles of a pipeline job.
///
/// A single cycle runs when `streaming` is false. Otherwise cycles repeat
/// with the same context until a fetch returns nothing. `max_batches` caps
/// the number of non-empty batches a streaming job may produce; one more
/// non-empty fetch past the cap fails the run.
pub fn run_pipeline(
    job: &dyn PipelineJob,
    ctx: &ShardingContext,
    streaming: bool,
    max_batches: Option<u64>,
) -> Result<PipelineStats, ExecutionError> {
    let mut stats = PipelineStats::default();

    loop {
        let cycle = stats.fetches + 1;
        let span = cycle_span(ctx.job_name(), cycle);
        let _enter = span.enter();

        let data = job
            .fetch_data(ctx)
            .map_err(|source| ExecutionError::FetchFailed {
                job_name: ctx.job_name().to_string(),
                cycle,
                source,
            })?;
        stats.fetches = cycle;

        if data.is_empty() {
            debug!("fetch returned no data");
            break;
        }

        if let Some(limit) = max_batches.filter(|limit| stats.batches >= *limit) {
            return Err(ExecutionError::CycleLimitExceeded {
                job_name: ctx.job_name().to_string(),
                limit,
            });
        }

        let count = data.len();
        debug!(count, "processing fetched data");
        job.process_data(ctx, data)
            .map_err(|source| ExecutionError::ProcessFailed {
                job_name: ctx.job_name().to_string(),
                cycle,
                source,
            })?;
        stats.batches += 1;
        stats.items_processed += count as u64;
        record_items_processed(ctx.job_name(), count);

        if !streaming {
            break;
        }
    }

    Ok(stats)
}
