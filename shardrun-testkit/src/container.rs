use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use shardrun::{JobContainer, JobInstance};

/// A recorded bean lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContainerLookup {
    pub resource: String,
    pub bean_name: String,
}

/// In-memory container keyed by resource and bean name.
#[derive(Clone, Default)]
pub struct MockContainer {
    beans: Arc<Mutex<HashMap<(String, String), JobInstance>>>,
    lookups: Arc<Mutex<Vec<ContainerLookup>>>,
}

impl MockContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bean(
        self,
        resource: impl Into<String>,
        bean_name: impl Into<String>,
        instance: JobInstance,
    ) -> Self {
        self.beans
            .lock()
            .insert((resource.into(), bean_name.into()), instance);
        self
    }

    pub fn lookups(&self) -> Vec<ContainerLookup> {
        self.lookups.lock().clone()
    }

    pub fn assert_lookup_count_eq(&self, expected: usize) {
        assert_eq!(
            self.lookups.lock().len(),
            expected,
            "Expected {} lookups, got {}",
            expected,
            self.lookups.lock().len()
        );
    }
}

impl JobContainer for MockContainer {
    fn get_bean(&self, resource: &str, bean_name: &str) -> anyhow::Result<JobInstance> {
        self.lookups.lock().push(ContainerLookup {
            resource: resource.to_string(),
            bean_name: bean_name.to_string(),
        });
        self.beans
            .lock()
            .get(&(resource.to_string(), bean_name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no bean named '{bean_name}' in '{resource}'"))
    }
}
