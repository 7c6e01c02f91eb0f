//! Per-shard runtime context handed to job implementations.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::ConfigError;
use crate::job::{JobCoreSettings, RunId, ShardingItemParameters};

const TASK_ID_DELIMITER: &str = "@-@";
const LOCAL_SLAVE_ID: &str = "local";

/// Identity of one local execution of one shard.
///
/// Renders as `{job}@-@{item}@-@READY@-@local@-@{run_id}`, the same shape the
/// cluster scheduler uses for task ids.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub job_name: String,
    pub sharding_item: u32,
    pub run_id: RunId,
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = TASK_ID_DELIMITER;
        write!(
            f,
            "{}{d}{}{d}READY{d}{LOCAL_SLAVE_ID}{d}{}",
            self.job_name, self.sharding_item, self.run_id
        )
    }
}

/// Snapshot of job identity, shard position, and parameters for one run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShardingContext {
    job_name: String,
    task_id: String,
    sharding_total_count: u32,
    job_parameter: String,
    sharding_item: u32,
    sharding_parameter: Option<String>,
    sharding_item_parameters: ShardingItemParameters,
}

impl ShardingContext {
    /// Build the context for `sharding_item` under a fresh run id.
    pub fn build(settings: &JobCoreSettings, sharding_item: u32) -> Result<Self, ConfigError> {
        Self::for_run(settings, sharding_item, RunId::new())
    }

    /// Build the context for `sharding_item` under the given run id.
    pub fn for_run(
        settings: &JobCoreSettings,
        sharding_item: u32,
        run_id: RunId,
    ) -> Result<Self, ConfigError> {
        let total = settings.sharding_total_count();
        if sharding_item >= total {
            return Err(ConfigError::ShardItemOutOfRange {
                item: sharding_item,
                total,
            });
        }

        let task_id = TaskId {
            job_name: settings.job_name().to_string(),
            sharding_item,
            run_id,
        };
        let parameters = settings.sharding_item_parameters();

        Ok(Self {
            job_name: settings.job_name().to_string(),
            task_id: task_id.to_string(),
            sharding_total_count: total,
            job_parameter: settings.job_parameter().to_string(),
            sharding_item,
            sharding_parameter: parameters.get(sharding_item).map(str::to_string),
            sharding_item_parameters: parameters.clone(),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn sharding_total_count(&self) -> u32 {
        self.sharding_total_count
    }

    pub fn job_parameter(&self) -> &str {
        &self.job_parameter
    }

    pub fn sharding_item(&self) -> u32 {
        self.sharding_item
    }

    /// Parameter configured for this shard, if any.
    pub fn sharding_parameter(&self) -> Option<&str> {
        self.sharding_parameter.as_deref()
    }

    /// Parameters for every shard, as configured.
    pub fn sharding_item_parameters(&self) -> &ShardingItemParameters {
        &self.sharding_item_parameters
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Build the sharding context for `sharding_item`.
pub fn build_context(
    settings: &JobCoreSettings,
    sharding_item: u32,
) -> Result<ShardingContext, ConfigError> {
    ShardingContext::build(settings, sharding_item)
}
