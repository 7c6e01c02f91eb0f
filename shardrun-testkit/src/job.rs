use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::bail;
use parking_lot::Mutex;
use shardrun::{PipelineJob, ShardingContext, SimpleJob};

/// Simple job that records the context of every execution.
///
/// Clones share their records, so a test can keep one handle and register
/// another with the runner.
#[derive(Clone, Default)]
pub struct RecordingSimpleJob {
    contexts: Arc<Mutex<Vec<ShardingContext>>>,
}

impl RecordingSimpleJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contexts(&self) -> Vec<ShardingContext> {
        self.contexts.lock().clone()
    }

    pub fn last_context(&self) -> Option<ShardingContext> {
        self.contexts.lock().last().cloned()
    }

    pub fn execution_count(&self) -> usize {
        self.contexts.lock().len()
    }

    /// Sharding parameters seen across executions, skipping shards without one.
    pub fn sharding_parameters(&self) -> Vec<String> {
        self.contexts
            .lock()
            .iter()
            .filter_map(|ctx| ctx.sharding_parameter().map(str::to_string))
            .collect()
    }

    pub fn assert_execution_count_eq(&self, expected: usize) {
        let actual = self.execution_count();
        assert_eq!(
            actual, expected,
            "Expected {} executions, got {}",
            expected, actual
        );
    }

    pub fn clear(&self) {
        self.contexts.lock().clear();
    }
}

impl SimpleJob for RecordingSimpleJob {
    fn execute(&self, ctx: &ShardingContext) -> anyhow::Result<()> {
        self.contexts.lock().push(ctx.clone());
        Ok(())
    }
}

/// Simple job that always fails with the given message.
#[derive(Clone, Debug)]
pub struct FailingSimpleJob {
    message: String,
}

impl FailingSimpleJob {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl SimpleJob for FailingSimpleJob {
    fn execute(&self, _ctx: &ShardingContext) -> anyhow::Result<()> {
        bail!("{}", self.message)
    }
}

#[derive(Default)]
struct PipelineScript {
    batches: VecDeque<Vec<String>>,
    endless: Option<Vec<String>>,
    fetch_count: usize,
    process_count: usize,
    output: Vec<String>,
    process_error: Option<String>,
}

/// Pipeline job that hands out prepared batches, then empty ones.
///
/// Each processed item is stored with a suffix appended (`-d` by default),
/// so tests can tell processed items from fetched ones.
#[derive(Clone)]
pub struct ScriptedPipelineJob {
    script: Arc<Mutex<PipelineScript>>,
    suffix: String,
}

impl ScriptedPipelineJob {
    pub fn new<I, B, S>(batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batches = batches
            .into_iter()
            .map(|batch| batch.into_iter().map(Into::into).collect())
            .collect();
        Self {
            script: Arc::new(Mutex::new(PipelineScript {
                batches,
                ..PipelineScript::default()
            })),
            suffix: "-d".to_string(),
        }
    }

    /// A job whose fetch never runs dry.
    pub fn endless<S: Into<String>>(batch: impl IntoIterator<Item = S>) -> Self {
        let job = Self::new(Vec::<Vec<String>>::new());
        job.script.lock().endless = Some(batch.into_iter().map(Into::into).collect());
        job
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Make every process call fail with `message`.
    pub fn failing_process(self, message: impl Into<String>) -> Self {
        self.script.lock().process_error = Some(message.into());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.script.lock().fetch_count
    }

    pub fn process_count(&self) -> usize {
        self.script.lock().process_count
    }

    pub fn output(&self) -> Vec<String> {
        self.script.lock().output.clone()
    }
}

impl PipelineJob for ScriptedPipelineJob {
    fn fetch_data(&self, _ctx: &ShardingContext) -> anyhow::Result<Vec<String>> {
        let mut script = self.script.lock();
        script.fetch_count += 1;
        if let Some(batch) = script.batches.pop_front() {
            return Ok(batch);
        }
        Ok(script.endless.clone().unwrap_or_default())
    }

    fn process_data(&self, _ctx: &ShardingContext, data: Vec<String>) -> anyhow::Result<()> {
        let mut script = self.script.lock();
        script.process_count += 1;
        if let Some(message) = &script.process_error {
            bail!("{}", message);
        }
        let suffix = &self.suffix;
        script
            .output
            .extend(data.into_iter().map(|item| format!("{item}{suffix}")));
        Ok(())
    }
}
