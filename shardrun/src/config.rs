use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens to a script job's stdout and stderr.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOutput {
    /// The child writes straight to the runner's stdout and stderr.
    #[default]
    Inherit,
    /// Both streams are collected and returned in the run report.
    Capture,
}

/// Configuration for a [`LocalRunner`](crate::runtime::LocalRunner).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Stdio handling for script jobs.
    #[serde(default)]
    pub script_output: ScriptOutput,
    /// Upper bound on non-empty fetch/process cycles of a streaming pipeline.
    /// `None` keeps looping until a fetch comes back empty.
    #[serde(default)]
    pub max_streaming_cycles: Option<u64>,
    /// Working directory for script jobs. Defaults to the runner's own.
    #[serde(default)]
    pub script_working_dir: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how script output is handled.
    pub fn with_script_output(mut self, output: ScriptOutput) -> Self {
        self.script_output = output;
        self
    }

    /// Cap the number of streaming cycles.
    pub fn with_max_streaming_cycles(mut self, limit: u64) -> Self {
        self.max_streaming_cycles = Some(limit);
        self
    }

    /// Run scripts from the given directory.
    pub fn with_script_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_working_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_streaming_cycles == Some(0) {
            return Err(ConfigError::ZeroCycleLimit);
        }
        Ok(())
    }
}
