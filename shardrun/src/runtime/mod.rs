/// Builder for constructing a local runner.
pub mod builder;
/// Fetch/process cycle driver for pipeline jobs.
pub mod pipeline;
/// Run reports and script outcomes.
pub mod report;
/// The dispatcher that runs one shard of a job.
pub mod runner;
/// Child-process execution of script jobs.
pub mod script;

pub use builder::LocalRunnerBuilder;
pub use pipeline::{run_pipeline, PipelineStats};
pub use report::{RunReport, ScriptOutcome};
pub use runner::LocalRunner;
pub use script::{sharding_env, CommandLine, ScriptInvoker};
