use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::runtime::CommandLine;

/// The three ways a job can be implemented.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Simple,
    Pipeline,
    Script,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Simple => "simple",
            JobKind::Pipeline => "pipeline",
            JobKind::Script => "script",
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of a single local run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-shard parameters keyed by shard index.
///
/// Accepts the textual notation `0=Beijing,1=Shanghai,2=Guangzhou`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardingItemParameters(BTreeMap<u32, String>);

impl ShardingItemParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `index=value,index=value` notation.
    ///
    /// Whitespace around indices and values is trimmed and empty entries are
    /// skipped. Duplicate indices are rejected.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidShardingItemParameters {
            input: input.to_string(),
            reason,
        };

        let mut items = BTreeMap::new();
        for entry in input.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (index, value) = entry
                .split_once('=')
                .ok_or_else(|| invalid(format!("entry '{entry}' is missing '='")))?;
            let index = index.trim();
            let item: u32 = index
                .parse()
                .map_err(|_| invalid(format!("'{index}' is not a shard index")))?;
            if items.insert(item, value.trim().to_string()).is_some() {
                return Err(invalid(format!("shard index {item} appears more than once")));
            }
        }
        Ok(Self(items))
    }

    pub fn insert(&mut self, item: u32, value: impl Into<String>) -> Option<String> {
        self.0.insert(item, value.into())
    }

    pub fn get(&self, item: u32) -> Option<&str> {
        self.0.get(&item).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(item, value)| (*item, value.as_str()))
    }

    fn validate(&self, total: u32) -> Result<(), ConfigError> {
        match self.0.keys().find(|item| **item >= total) {
            Some(item) => Err(ConfigError::ShardParameterOutOfRange { item: *item, total }),
            None => Ok(()),
        }
    }
}

impl Display for ShardingItemParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (item, value) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{item}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<BTreeMap<u32, String>> for ShardingItemParameters {
    fn from(value: BTreeMap<u32, String>) -> Self {
        Self(value)
    }
}

impl<V: Into<String>> FromIterator<(u32, V)> for ShardingItemParameters {
    fn from_iter<T: IntoIterator<Item = (u32, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Settings shared by every job type.
///
/// Built through [`JobCoreSettings::builder`]; read-only afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobCoreSettings {
    job_name: String,
    cron: String,
    sharding_total_count: u32,
    #[serde(default)]
    sharding_item_parameters: ShardingItemParameters,
    #[serde(default)]
    job_parameter: String,
}

impl JobCoreSettings {
    pub fn builder(
        job_name: impl Into<String>,
        cron: impl Into<String>,
        sharding_total_count: u32,
    ) -> JobCoreSettingsBuilder {
        JobCoreSettingsBuilder {
            job_name: job_name.into(),
            cron: cron.into(),
            sharding_total_count,
            sharding_item_parameters: Ok(ShardingItemParameters::new()),
            job_parameter: String::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Trigger expression. Kept for fidelity with the deployed definition;
    /// local runs never evaluate it.
    pub fn cron(&self) -> &str {
        &self.cron
    }

    pub fn sharding_total_count(&self) -> u32 {
        self.sharding_total_count
    }

    pub fn sharding_item_parameters(&self) -> &ShardingItemParameters {
        &self.sharding_item_parameters
    }

    pub fn job_parameter(&self) -> &str {
        &self.job_parameter
    }

    /// Structural checks: non-empty name, positive total, parameter keys in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job_name.trim().is_empty() {
            return Err(ConfigError::EmptyJobName);
        }
        if self.sharding_total_count == 0 {
            return Err(ConfigError::ZeroShardCount);
        }
        self.sharding_item_parameters
            .validate(self.sharding_total_count)
    }
}

/// Builder for [`JobCoreSettings`].
#[derive(Debug)]
pub struct JobCoreSettingsBuilder {
    job_name: String,
    cron: String,
    sharding_total_count: u32,
    sharding_item_parameters: Result<ShardingItemParameters, ConfigError>,
    job_parameter: String,
}

impl JobCoreSettingsBuilder {
    /// Set per-shard parameters from the `0=a,1=b` notation.
    ///
    /// Parse errors are reported by [`build`](Self::build).
    pub fn sharding_item_parameters(mut self, notation: &str) -> Self {
        self.sharding_item_parameters = ShardingItemParameters::parse(notation);
        self
    }

    pub fn sharding_parameters(mut self, parameters: ShardingItemParameters) -> Self {
        self.sharding_item_parameters = Ok(parameters);
        self
    }

    pub fn job_parameter(mut self, job_parameter: impl Into<String>) -> Self {
        self.job_parameter = job_parameter.into();
        self
    }

    pub fn build(self) -> Result<JobCoreSettings, ConfigError> {
        let settings = JobCoreSettings {
            job_name: self.job_name,
            cron: self.cron,
            sharding_total_count: self.sharding_total_count,
            sharding_item_parameters: self.sharding_item_parameters?,
            job_parameter: self.job_parameter,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// How the job is implemented and invoked.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobTypeConfig {
    /// In-process job with a single execute operation.
    Simple { job_class: String },
    /// In-process job split into fetch and process steps.
    Pipeline {
        job_class: String,
        #[serde(default)]
        streaming: bool,
    },
    /// External executable.
    Script { command_line: String },
}

impl JobTypeConfig {
    pub fn simple(job_class: impl Into<String>) -> Self {
        JobTypeConfig::Simple {
            job_class: job_class.into(),
        }
    }

    pub fn pipeline(job_class: impl Into<String>, streaming: bool) -> Self {
        JobTypeConfig::Pipeline {
            job_class: job_class.into(),
            streaming,
        }
    }

    pub fn script(command_line: impl Into<String>) -> Self {
        JobTypeConfig::Script {
            command_line: command_line.into(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobTypeConfig::Simple { .. } => JobKind::Simple,
            JobTypeConfig::Pipeline { .. } => JobKind::Pipeline,
            JobTypeConfig::Script { .. } => JobKind::Script,
        }
    }

    /// Implementation name for in-process job types.
    pub fn job_class(&self) -> Option<&str> {
        match self {
            JobTypeConfig::Simple { job_class } | JobTypeConfig::Pipeline { job_class, .. } => {
                Some(job_class)
            }
            JobTypeConfig::Script { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            JobTypeConfig::Simple { job_class } | JobTypeConfig::Pipeline { job_class, .. }
                if job_class.trim().is_empty() =>
            {
                Err(ConfigError::EmptyJobClass { kind: self.kind() })
            }
            JobTypeConfig::Script { command_line } if command_line.trim().is_empty() => {
                Err(ConfigError::EmptyCommandLine)
            }
            _ => Ok(()),
        }
    }
}

/// Where to fetch a pre-wired job instance from an external container.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Resource the container is built from (e.g. a context file).
    pub resource: String,
    /// Name of the job bean inside the container.
    pub bean_name: String,
}

impl ContainerDescriptor {
    pub fn new(resource: impl Into<String>, bean_name: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            bean_name: bean_name.into(),
        }
    }
}

/// Everything needed to run one shard of a job locally.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LocalRunRequest {
    pub settings: JobCoreSettings,
    pub job_type: JobTypeConfig,
    pub sharding_item: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerDescriptor>,
}

impl LocalRunRequest {
    pub fn new(settings: JobCoreSettings, job_type: JobTypeConfig, sharding_item: u32) -> Self {
        Self {
            settings,
            job_type,
            sharding_item,
            container: None,
        }
    }

    /// Fetch the job instance from an external container instead of the registry.
    pub fn with_container(mut self, container: ContainerDescriptor) -> Self {
        self.container = Some(container);
        self
    }

    pub fn kind(&self) -> JobKind {
        self.job_type.kind()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        self.job_type.validate()?;
        let total = self.settings.sharding_total_count();
        if self.sharding_item >= total {
            return Err(ConfigError::ShardItemOutOfRange {
                item: self.sharding_item,
                total,
            });
        }
        if let Some(container) = &self.container {
            if container.resource.trim().is_empty() {
                return Err(ConfigError::IncompleteContainerDescriptor("resource"));
            }
            if container.bean_name.trim().is_empty() {
                return Err(ConfigError::IncompleteContainerDescriptor("bean name"));
            }
        }
        if let JobTypeConfig::Script { command_line } = &self.job_type {
            reject_nul("command line", command_line)?;
            CommandLine::parse(command_line)?;
            self.validate_script_env()?;
        }
        Ok(())
    }

    /// Every value exported to a script's environment must be a valid C string.
    fn validate_script_env(&self) -> Result<(), ConfigError> {
        reject_nul("job name", self.settings.job_name())?;
        reject_nul("job parameter", self.settings.job_parameter())?;
        if let Some(parameter) = self
            .settings
            .sharding_item_parameters()
            .get(self.sharding_item)
        {
            reject_nul("sharding parameter", parameter)?;
        }
        Ok(())
    }
}

fn reject_nul(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.contains('\0') {
        return Err(ConfigError::NulByte(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JobCoreSettings {
        JobCoreSettings::builder("demo", "*/2 * * * * ?", 3)
            .build()
            .unwrap()
    }

    #[test]
    fn parses_sharding_item_parameter_notation() {
        let params = ShardingItemParameters::parse("0=Beijing, 1 = Shanghai ,,2=Guangzhou").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), Some("Beijing"));
        assert_eq!(params.get(1), Some("Shanghai"));
        assert_eq!(params.get(2), Some("Guangzhou"));
        assert_eq!(params.get(3), None);
        assert_eq!(params.to_string(), "0=Beijing,1=Shanghai,2=Guangzhou");
    }

    #[test]
    fn empty_notation_yields_no_parameters() {
        assert!(ShardingItemParameters::parse("").unwrap().is_empty());
        assert!(ShardingItemParameters::parse(" , ").unwrap().is_empty());
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let params = ShardingItemParameters::parse("0=a=b").unwrap();
        assert_eq!(params.get(0), Some("a=b"));
    }

    #[test]
    fn rejects_malformed_notation() {
        for input in ["0Beijing", "x=Beijing", "-1=Beijing", "0=a,0=b"] {
            assert!(
                matches!(
                    ShardingItemParameters::parse(input),
                    Err(ConfigError::InvalidShardingItemParameters { .. })
                ),
                "expected '{input}' to be rejected"
            );
        }
    }

    #[test]
    fn builder_defaults() {
        let settings = settings();
        assert_eq!(settings.job_name(), "demo");
        assert_eq!(settings.cron(), "*/2 * * * * ?");
        assert_eq!(settings.sharding_total_count(), 3);
        assert_eq!(settings.job_parameter(), "");
        assert!(settings.sharding_item_parameters().is_empty());
    }

    #[test]
    fn builder_rejects_invalid_settings() {
        assert_eq!(
            JobCoreSettings::builder("", "", 1).build(),
            Err(ConfigError::EmptyJobName)
        );
        assert_eq!(
            JobCoreSettings::builder("demo", "", 0).build(),
            Err(ConfigError::ZeroShardCount)
        );
        assert_eq!(
            JobCoreSettings::builder("demo", "", 2)
                .sharding_item_parameters("0=a,2=c")
                .build(),
            Err(ConfigError::ShardParameterOutOfRange { item: 2, total: 2 })
        );
        assert!(matches!(
            JobCoreSettings::builder("demo", "", 2)
                .sharding_item_parameters("oops")
                .build(),
            Err(ConfigError::InvalidShardingItemParameters { .. })
        ));
    }

    #[test]
    fn request_validation() {
        let ok = LocalRunRequest::new(settings(), JobTypeConfig::simple("demo.Job"), 2);
        assert!(ok.validate().is_ok());

        let out_of_range = LocalRunRequest::new(settings(), JobTypeConfig::simple("demo.Job"), 3);
        assert_eq!(
            out_of_range.validate(),
            Err(ConfigError::ShardItemOutOfRange { item: 3, total: 3 })
        );

        let no_class = LocalRunRequest::new(settings(), JobTypeConfig::pipeline(" ", true), 0);
        assert_eq!(
            no_class.validate(),
            Err(ConfigError::EmptyJobClass {
                kind: JobKind::Pipeline
            })
        );

        let no_command = LocalRunRequest::new(settings(), JobTypeConfig::script(""), 0);
        assert_eq!(no_command.validate(), Err(ConfigError::EmptyCommandLine));

        let bad_container = LocalRunRequest::new(settings(), JobTypeConfig::simple("demo.Job"), 0)
            .with_container(ContainerDescriptor::new("context.xml", ""));
        assert_eq!(
            bad_container.validate(),
            Err(ConfigError::IncompleteContainerDescriptor("bean name"))
        );
    }

    #[test]
    fn script_request_parses_command_line_during_validation() {
        let ok = LocalRunRequest::new(settings(), JobTypeConfig::script("sh -c 'exit 0'"), 0);
        assert!(ok.validate().is_ok());

        let unterminated = LocalRunRequest::new(settings(), JobTypeConfig::script("sh -c 'oops"), 0);
        assert_eq!(
            unterminated.validate(),
            Err(ConfigError::UnterminatedQuote("sh -c 'oops".to_string()))
        );
    }

    #[test]
    fn script_request_rejects_nul_in_environment_values() {
        let job_parameter = JobCoreSettings::builder("demo", "", 2)
            .job_parameter("a\0b")
            .build()
            .unwrap();
        let request = LocalRunRequest::new(job_parameter.clone(), JobTypeConfig::script("true"), 0);
        assert_eq!(request.validate(), Err(ConfigError::NulByte("job parameter")));

        let job_name = JobCoreSettings::builder("de\0mo", "", 2).build().unwrap();
        let request = LocalRunRequest::new(job_name, JobTypeConfig::script("true"), 0);
        assert_eq!(request.validate(), Err(ConfigError::NulByte("job name")));

        let sharding = JobCoreSettings::builder("demo", "", 2)
            .sharding_item_parameters("0=ok,1=b\0ad")
            .build()
            .unwrap();
        let first = LocalRunRequest::new(sharding.clone(), JobTypeConfig::script("true"), 0);
        assert!(first.validate().is_ok());
        let second = LocalRunRequest::new(sharding, JobTypeConfig::script("true"), 1);
        assert_eq!(second.validate(), Err(ConfigError::NulByte("sharding parameter")));

        let command = LocalRunRequest::new(settings(), JobTypeConfig::script("tr\0ue"), 0);
        assert_eq!(command.validate(), Err(ConfigError::NulByte("command line")));

        // Only values handed to a child process are restricted.
        let simple = LocalRunRequest::new(job_parameter, JobTypeConfig::simple("demo.Job"), 0);
        assert!(simple.validate().is_ok());
    }

    #[test]
    fn job_type_accessors() {
        assert_eq!(JobTypeConfig::simple("a").kind(), JobKind::Simple);
        assert_eq!(JobTypeConfig::pipeline("b", false).job_class(), Some("b"));
        assert_eq!(JobTypeConfig::script("run.sh").job_class(), None);
        assert_eq!(JobKind::Pipeline.to_string(), "pipeline");
    }

    #[test]
    fn request_deserializes_from_json() {
        let request: LocalRunRequest = serde_json::from_str(
            r#"{
                "settings": {
                    "job_name": "demo",
                    "cron": "0 * * * * ?",
                    "sharding_total_count": 3,
                    "sharding_item_parameters": {"0": "Beijing", "1": "Shanghai"},
                    "job_parameter": "dbName=dangdang"
                },
                "job_type": {"type": "pipeline", "job_class": "demo.Pipeline", "streaming": true},
                "sharding_item": 1
            }"#,
        )
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.kind(), JobKind::Pipeline);
        assert_eq!(request.settings.sharding_item_parameters().get(1), Some("Shanghai"));
        assert_eq!(request.settings.job_parameter(), "dbName=dangdang");
        assert!(request.container.is_none());
    }

    #[test]
    fn deserialized_settings_are_revalidated() {
        let request: LocalRunRequest = serde_json::from_str(
            r#"{
                "settings": {"job_name": "demo", "cron": "", "sharding_total_count": 0},
                "job_type": {"type": "script", "command_line": "run.sh"},
                "sharding_item": 0
            }"#,
        )
        .unwrap();
        assert_eq!(request.validate(), Err(ConfigError::ZeroShardCount));
    }

    #[test]
    fn run_ids_are_unique() {
        let first = RunId::new();
        assert_ne!(first, RunId::new());
        assert_eq!(first.as_uuid().get_version_num(), 7);
        assert_eq!(first.to_string(), first.as_uuid().to_string());
    }
}
