//! Fixtures for testing jobs and the local runner.
//!
//! - [`RecordingSimpleJob`] records every context it is executed with.
//! - [`FailingSimpleJob`] always fails.
//! - [`ScriptedPipelineJob`] replays prepared batches and transforms items.
//! - [`MockContainer`] serves beans and records lookups.
//! - [`write_script`] writes shell scripts for script-job tests.

mod container;
mod job;
mod script;

pub use container::{ContainerLookup, MockContainer};
pub use job::{FailingSimpleJob, RecordingSimpleJob, ScriptedPipelineJob};
pub use script::{sh_command_line, write_script};
