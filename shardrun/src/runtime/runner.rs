use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::context::ShardingContext;
use crate::error::{ExecutionError, ResolutionError, RunError};
use crate::job::{JobKind, JobTypeConfig, LocalRunRequest, RunId};
use crate::registry::{JobContainer, JobInstance, JobResolver, PipelineJob, SimpleJob};
use crate::telemetry::{record_run_end, record_run_start, run_span};

use super::builder::LocalRunnerBuilder;
use super::pipeline::{run_pipeline, PipelineStats};
use super::report::{RunReport, ScriptOutcome};
use super::script::ScriptInvoker;

/// Runs one shard of a job definition in the current process.
///
/// Each call to [`run`](Self::run) is independent: it validates the request,
/// builds a fresh [`ShardingContext`], picks the strategy for the declared job
/// type, and reports the outcome. Nothing is retried.
pub struct LocalRunner {
    config: RunnerConfig,
    resolver: Arc<dyn JobResolver>,
    container: Option<Arc<dyn JobContainer>>,
    invoker: ScriptInvoker,
}

#[derive(Default)]
struct Tally {
    pipeline: PipelineStats,
    script: Option<ScriptOutcome>,
}

impl LocalRunner {
    pub fn builder() -> LocalRunnerBuilder {
        LocalRunnerBuilder::new()
    }

    pub(crate) fn from_parts(
        config: RunnerConfig,
        resolver: Arc<dyn JobResolver>,
        container: Option<Arc<dyn JobContainer>>,
    ) -> Self {
        let invoker = ScriptInvoker::from_config(&config);
        Self {
            config,
            resolver,
            container,
            invoker,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute the request once and report how it went.
    pub fn run(&self, request: &LocalRunRequest) -> Result<RunReport, RunError> {
        let run_id = RunId::new();
        let job_kind = request.kind();
        let span = run_span(
            run_id.to_string(),
            request.settings.job_name(),
            job_kind.as_str(),
            request.sharding_item,
        );
        let _enter = span.enter();

        info!("starting local run");
        let timing = record_run_start(run_id.to_string());
        let started_at = Utc::now();

        let result = self.dispatch(request, run_id);

        let status = match &result {
            Ok(_) => "success",
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "local run failed");
                err.kind().as_str()
            }
        };
        let elapsed = record_run_end(timing, job_kind.as_str(), status);
        let (ctx, tally) = result?;

        Ok(RunReport {
            run_id,
            task_id: ctx.task_id().to_string(),
            job_name: ctx.job_name().to_string(),
            job_kind,
            sharding_item: ctx.sharding_item(),
            fetches: tally.pipeline.fetches,
            batches: tally.pipeline.batches,
            items_processed: tally.pipeline.items_processed,
            script: tally.script,
            started_at,
            finished_at: Utc::now(),
            elapsed,
        })
    }

    fn dispatch(
        &self,
        request: &LocalRunRequest,
        run_id: RunId,
    ) -> Result<(ShardingContext, Tally), RunError> {
        request.validate()?;
        let ctx = ShardingContext::for_run(&request.settings, request.sharding_item, run_id)?;

        let mut tally = Tally::default();
        match &request.job_type {
            JobTypeConfig::Simple { job_class } => {
                let job = self.resolve_simple(request, job_class)?;
                job.execute(&ctx)
                    .map_err(|source| ExecutionError::JobFailed {
                        job_name: ctx.job_name().to_string(),
                        source,
                    })?;
            }
            JobTypeConfig::Pipeline {
                job_class,
                streaming,
            } => {
                let job = self.resolve_pipeline(request, job_class)?;
                tally.pipeline = run_pipeline(
                    job.as_ref(),
                    &ctx,
                    *streaming,
                    self.config.max_streaming_cycles,
                )?;
            }
            JobTypeConfig::Script { command_line } => {
                if request.container.is_some() {
                    debug!("container descriptor ignored for script job");
                }
                tally.script = Some(self.invoker.invoke(command_line, &ctx)?);
            }
        }
        Ok((ctx, tally))
    }

    fn resolve_simple(
        &self,
        request: &LocalRunRequest,
        job_class: &str,
    ) -> Result<Arc<dyn SimpleJob>, ResolutionError> {
        match self.resolve(request, job_class)? {
            JobInstance::Simple(job) => Ok(job),
            other => Err(mismatch(request, job_class, JobKind::Simple, other.kind())),
        }
    }

    fn resolve_pipeline(
        &self,
        request: &LocalRunRequest,
        job_class: &str,
    ) -> Result<Arc<dyn PipelineJob>, ResolutionError> {
        match self.resolve(request, job_class)? {
            JobInstance::Pipeline(job) => Ok(job),
            other => Err(mismatch(request, job_class, JobKind::Pipeline, other.kind())),
        }
    }

    /// Look the job up in the container when the request names one, otherwise
    /// in the resolver.
    fn resolve(
        &self,
        request: &LocalRunRequest,
        job_class: &str,
    ) -> Result<JobInstance, ResolutionError> {
        let Some(descriptor) = &request.container else {
            debug!(job_class, "resolving job from registry");
            return self.resolver.resolve(job_class);
        };

        let container =
            self.container
                .as_ref()
                .ok_or_else(|| ResolutionError::ContainerUnavailable {
                    resource: descriptor.resource.clone(),
                    bean_name: descriptor.bean_name.clone(),
                })?;
        debug!(
            resource = %descriptor.resource,
            bean_name = %descriptor.bean_name,
            "resolving job from container"
        );
        container
            .get_bean(&descriptor.resource, &descriptor.bean_name)
            .map_err(|source| ResolutionError::ContainerLookup {
                resource: descriptor.resource.clone(),
                bean_name: descriptor.bean_name.clone(),
                source,
            })
    }
}

fn mismatch(
    request: &LocalRunRequest,
    job_class: &str,
    expected: JobKind,
    actual: JobKind,
) -> ResolutionError {
    let name = match &request.container {
        Some(descriptor) => descriptor.bean_name.clone(),
        None => job_class.to_string(),
    };
    ResolutionError::KindMismatch {
        name,
        expected,
        actual,
    }
}

impl fmt::Debug for LocalRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRunner")
            .field("config", &self.config)
            .field("has_container", &self.container.is_some())
            .finish()
    }
}
