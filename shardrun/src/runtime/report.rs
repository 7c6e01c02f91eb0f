use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::job::{JobKind, RunId};

/// Output of a finished script process.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    pub exit_code: i32,
    /// Collected stdout; `None` when output was inherited.
    pub stdout: Option<String>,
    /// Collected stderr; `None` when output was inherited.
    pub stderr: Option<String>,
}

/// Summary of a successful local run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub task_id: String,
    pub job_name: String,
    pub job_kind: JobKind,
    pub sharding_item: u32,
    /// Fetch calls made by a pipeline job. Zero for other kinds.
    pub fetches: u64,
    /// Process calls made by a pipeline job. Zero for other kinds.
    pub batches: u64,
    /// Items handed to process calls.
    pub items_processed: u64,
    pub script: Option<ScriptOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}
