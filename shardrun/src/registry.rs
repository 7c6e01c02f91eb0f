//! Job contracts and name-based resolution.
//!
//! Job implementations are looked up by the name declared in the job type
//! configuration. The [`JobRegistry`] maps names to factories and is filled by
//! whoever assembles the runner; an external [`JobContainer`] can supply
//! pre-wired instances instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::ShardingContext;
use crate::error::ResolutionError;
use crate::job::JobKind;

/// A job invoked once per cycle.
pub trait SimpleJob: Send + Sync {
    fn execute(&self, ctx: &ShardingContext) -> anyhow::Result<()>;
}

/// A job split into a fetch step and a process step.
pub trait PipelineJob: Send + Sync {
    /// Fetch the next batch of work items. An empty batch ends the cycle.
    fn fetch_data(&self, ctx: &ShardingContext) -> anyhow::Result<Vec<String>>;

    /// Process a non-empty batch returned by [`fetch_data`](Self::fetch_data).
    fn process_data(&self, ctx: &ShardingContext, data: Vec<String>) -> anyhow::Result<()>;
}

/// A resolved job implementation.
#[derive(Clone)]
pub enum JobInstance {
    Simple(Arc<dyn SimpleJob>),
    Pipeline(Arc<dyn PipelineJob>),
}

impl JobInstance {
    pub fn simple(job: impl SimpleJob + 'static) -> Self {
        JobInstance::Simple(Arc::new(job))
    }

    pub fn pipeline(job: impl PipelineJob + 'static) -> Self {
        JobInstance::Pipeline(Arc::new(job))
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobInstance::Simple(_) => JobKind::Simple,
            JobInstance::Pipeline(_) => JobKind::Pipeline,
        }
    }
}

impl fmt::Debug for JobInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JobInstance").field(&self.kind()).finish()
    }
}

/// Resolves a job implementation name to an instance.
pub trait JobResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<JobInstance, ResolutionError>;
}

/// External dependency-injection container holding pre-wired jobs.
///
/// Opaque to the runner: it only distinguishes an instance from a failure.
pub trait JobContainer: Send + Sync {
    fn get_bean(&self, resource: &str, bean_name: &str) -> anyhow::Result<JobInstance>;
}

type JobFactory = Box<dyn Fn() -> anyhow::Result<JobInstance> + Send + Sync>;

/// Name-to-factory registry of job implementations.
///
/// Each resolution calls the factory, so every run gets a fresh instance
/// unless the factory hands out a shared one.
#[derive(Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallible factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<JobInstance> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn register_simple<J, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        J: SimpleJob + 'static,
        F: Fn() -> J + Send + Sync + 'static,
    {
        self.register(name, move || Ok(JobInstance::simple(factory())))
    }

    pub fn register_pipeline<J, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        J: PipelineJob + 'static,
        F: Fn() -> J + Send + Sync + 'static,
    {
        self.register(name, move || Ok(JobInstance::pipeline(factory())))
    }

    /// Register one shared instance handed out on every resolution.
    pub fn register_instance(&mut self, name: impl Into<String>, instance: JobInstance) -> &mut Self {
        self.register(name, move || Ok(instance.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl JobResolver for JobRegistry {
    fn resolve(&self, name: &str) -> Result<JobInstance, ResolutionError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ResolutionError::NotRegistered {
                name: name.to_string(),
            })?;
        factory().map_err(|source| ResolutionError::Instantiation {
            name: name.to_string(),
            source,
        })
    }
}
