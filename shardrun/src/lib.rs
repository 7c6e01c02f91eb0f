//! Shardrun - run sharded job definitions locally.
//!
//! A harness for executing one shard of a cloud-scheduled job definition
//! inside the current process, with the same execution contract the cluster
//! scheduler uses. Intended for development and verification before a job is
//! deployed.
//!
//! # Core Concepts
//!
//! - **Request**: A [`LocalRunRequest`] combines [`JobCoreSettings`], a
//!   [`JobTypeConfig`] (simple, pipeline, or script), the shard to run, and an
//!   optional [`ContainerDescriptor`].
//!
//! - **Context**: A [`ShardingContext`] is built per run and tells the job
//!   which shard it is and which parameters apply.
//!
//! - **Resolution**: Job implementations are found by name through a
//!   [`JobResolver`] (usually a [`JobRegistry`]) or an external
//!   [`JobContainer`].
//!
//! - **Runner**: The [`LocalRunner`] dispatches the request to the strategy for
//!   its job type and returns a [`RunReport`] or a classified [`RunError`].
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use shardrun::*;
//!
//! let settings = JobCoreSettings::builder("order-sync", "0 */5 * * * ?", 3)
//!     .sharding_item_parameters("0=Beijing,1=Shanghai,2=Guangzhou")
//!     .build()?;
//! let request = LocalRunRequest::new(settings, JobTypeConfig::simple("com.example.OrderSync"), 1);
//!
//! let runner = LocalRunner::builder().with_registry(registry).build()?;
//! let report = runner.run(&request)?;
//! ```

/// Runner configuration.
///
/// The `config` module defines [`RunnerConfig`] and [`ScriptOutput`].
pub mod config;

/// Per-shard runtime context.
///
/// The `context` module provides [`ShardingContext`], [`TaskId`], and
/// [`build_context`].
pub mod context;

/// Error taxonomy.
///
/// The `error` module defines [`RunError`] and its three kinds:
/// [`ConfigError`], [`ResolutionError`], and [`ExecutionError`].
pub mod error;

/// Job definition model.
///
/// The `job` module defines:
/// - [`JobCoreSettings`] - settings shared by every job type
/// - [`ShardingItemParameters`] - per-shard parameters
/// - [`JobTypeConfig`] - simple, pipeline, or script
/// - [`JobKind`] - the job type tag
/// - [`ContainerDescriptor`] - external container lookup
/// - [`LocalRunRequest`] - one shard of one job to run
/// - [`RunId`] - identifier of a run
pub mod job;

#[cfg(feature = "metrics")]
/// Prometheus metrics.
pub mod metrics;

/// Job contracts and resolution.
///
/// The `registry` module defines the [`SimpleJob`] and [`PipelineJob`]
/// contracts, [`JobInstance`], the [`JobResolver`] and [`JobContainer`]
/// seams, and the [`JobRegistry`].
pub mod registry;

/// Local execution.
///
/// The `runtime` module provides the [`LocalRunner`] dispatcher, its builder,
/// the pipeline cycle driver, and the script invoker.
pub mod runtime;

/// Tracing spans and run recording.
pub mod telemetry;

pub use config::*;
pub use context::*;
pub use error::{ConfigError, ErrorKind, ExecutionError, ResolutionError, RunError};
pub use job::*;
pub use registry::*;
pub use runtime::{LocalRunner, LocalRunnerBuilder, RunReport, ScriptOutcome};
