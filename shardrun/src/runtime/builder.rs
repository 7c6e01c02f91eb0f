use std::fmt;
use std::sync::Arc;

use crate::config::RunnerConfig;
use crate::registry::{JobContainer, JobRegistry, JobResolver};

use super::runner::LocalRunner;

/// Builder for a [`LocalRunner`].
///
/// Without a resolver the runner gets an empty [`JobRegistry`], which is
/// enough for script jobs. A container is only consulted for requests that
/// carry a container descriptor.
///
/// # Example
///
/// ```ignore
/// use shardrun::*;
///
/// let mut registry = JobRegistry::new();
/// registry.register_simple("com.example.OrderSync", || OrderSync::default());
///
/// let runner = LocalRunner::builder()
///     .with_config(RunnerConfig::new().with_max_streaming_cycles(100))
///     .with_registry(registry)
///     .build()?;
/// ```
#[derive(Default)]
pub struct LocalRunnerBuilder {
    config: RunnerConfig,
    resolver: Option<Arc<dyn JobResolver>>,
    container: Option<Arc<dyn JobContainer>>,
}

impl fmt::Debug for LocalRunnerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRunnerBuilder")
            .field("config", &self.config)
            .field("resolver", &self.resolver.as_ref().map(|_| "<resolver>"))
            .field("container", &self.container.as_ref().map(|_| "<container>"))
            .finish()
    }
}

impl LocalRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(self, registry: JobRegistry) -> Self {
        self.with_resolver(registry)
    }

    pub fn with_resolver(mut self, resolver: impl JobResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_shared_resolver(mut self, resolver: Arc<dyn JobResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_container(mut self, container: impl JobContainer + 'static) -> Self {
        self.container = Some(Arc::new(container));
        self
    }

    pub fn with_shared_container(mut self, container: Arc<dyn JobContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Validate the configuration and build the runner.
    pub fn build(self) -> anyhow::Result<LocalRunner> {
        self.config.validate()?;
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(JobRegistry::new()));
        Ok(LocalRunner::from_parts(self.config, resolver, self.container))
    }
}
