//! Error taxonomy for local runs.
//!
//! Every failure surfaced by [`LocalRunner::run`](crate::runtime::LocalRunner::run)
//! falls into exactly one of three kinds so callers can tell a misconfigured
//! job apart from a job that ran and failed:
//!
//! - [`ConfigError`] - the request itself is malformed.
//! - [`ResolutionError`] - the job implementation, container bean, or script
//!   executable could not be located or started.
//! - [`ExecutionError`] - the job ran and signaled failure.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobKind;

/// The three outcome classes a failed run can belong to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Execution,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Execution => "execution",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Malformed request or runner configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("job name must not be empty")]
    EmptyJobName,

    #[error("sharding total count must be positive")]
    ZeroShardCount,

    #[error("sharding item {item} is out of range for total count {total}")]
    ShardItemOutOfRange { item: u32, total: u32 },

    #[error("sharding parameter key {item} is out of range for total count {total}")]
    ShardParameterOutOfRange { item: u32, total: u32 },

    #[error("invalid sharding item parameters '{input}': {reason}")]
    InvalidShardingItemParameters { input: String, reason: String },

    #[error("{kind} job requires a non-empty job class")]
    EmptyJobClass { kind: JobKind },

    #[error("script job requires a non-empty command line")]
    EmptyCommandLine,

    #[error("unterminated quote in command line '{0}'")]
    UnterminatedQuote(String),

    #[error("{0} must not contain a NUL byte when passed to a script")]
    NulByte(&'static str),

    #[error("container descriptor requires a non-empty {0}")]
    IncompleteContainerDescriptor(&'static str),

    #[error("max streaming cycles must be positive when set")]
    ZeroCycleLimit,
}

/// A job implementation or executable could not be located or started.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no job registered under '{name}'")]
    NotRegistered { name: String },

    #[error("failed to instantiate job '{name}': {source}")]
    Instantiation {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("job '{name}' resolved to a {actual} job but was declared as {expected}")]
    KindMismatch {
        name: String,
        expected: JobKind,
        actual: JobKind,
    },

    #[error("run requests bean '{bean_name}' from '{resource}' but no container is configured")]
    ContainerUnavailable { resource: String, bean_name: String },

    #[error("container lookup of bean '{bean_name}' in '{resource}' failed: {source}")]
    ContainerLookup {
        resource: String,
        bean_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to launch script '{}': {source}", .program.display())]
    ScriptLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The job ran and signaled failure.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("job '{job_name}' failed: {source}")]
    JobFailed {
        job_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("job '{job_name}' failed to fetch data in cycle {cycle}: {source}")]
    FetchFailed {
        job_name: String,
        cycle: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("job '{job_name}' failed to process data in cycle {cycle}: {source}")]
    ProcessFailed {
        job_name: String,
        cycle: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("streaming job '{job_name}' still fetched data after {limit} cycles")]
    CycleLimitExceeded { job_name: String, limit: u64 },

    #[error("script exited with status {code}")]
    ScriptExit {
        code: i32,
        /// Captured stderr, when the runner captures script output.
        stderr: Option<String>,
    },

    #[error("script was terminated without an exit code")]
    ScriptTerminated,

    #[error("failed waiting for script '{}': {source}", .program.display())]
    ScriptWait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// Exit code of a failed script, if this error came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::ScriptExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Error returned by a local run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Configuration(_) => ErrorKind::Configuration,
            RunError::Resolution(_) => ErrorKind::Resolution,
            RunError::Execution(_) => ErrorKind::Execution,
        }
    }

    pub fn as_configuration(&self) -> Option<&ConfigError> {
        match self {
            RunError::Configuration(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_resolution(&self) -> Option<&ResolutionError> {
        match self {
            RunError::Resolution(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_execution(&self) -> Option<&ExecutionError> {
        match self {
            RunError::Execution(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for local runs.
pub type Result<T> = std::result::Result<T, RunError>;
