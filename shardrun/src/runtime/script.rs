//! Runs script jobs as child processes.
//!
//! The sharding context reaches the script through environment variables
//! rather than arguments, so any executable can be used regardless of its
//! argument conventions:
//!
//! | Variable | Value |
//! |---|---|
//! | `SHARDRUN_JOB_NAME` | job name |
//! | `SHARDRUN_TASK_ID` | task id of this run |
//! | `SHARDRUN_SHARDING_TOTAL_COUNT` | total shard count |
//! | `SHARDRUN_SHARDING_ITEM` | index of the shard being run |
//! | `SHARDRUN_JOB_PARAMETER` | job parameter, possibly empty |
//! | `SHARDRUN_SHARDING_PARAMETER` | this shard's parameter; unset when none is configured |
//! | `SHARDRUN_SHARDING_CONTEXT` | the whole context as JSON |

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::config::{RunnerConfig, ScriptOutput};
use crate::context::ShardingContext;
use crate::error::{ConfigError, ExecutionError, ResolutionError, RunError};
use crate::runtime::report::ScriptOutcome;
use crate::telemetry::script_span;

pub const ENV_JOB_NAME: &str = "SHARDRUN_JOB_NAME";
pub const ENV_TASK_ID: &str = "SHARDRUN_TASK_ID";
pub const ENV_SHARDING_TOTAL_COUNT: &str = "SHARDRUN_SHARDING_TOTAL_COUNT";
pub const ENV_SHARDING_ITEM: &str = "SHARDRUN_SHARDING_ITEM";
pub const ENV_JOB_PARAMETER: &str = "SHARDRUN_JOB_PARAMETER";
pub const ENV_SHARDING_PARAMETER: &str = "SHARDRUN_SHARDING_PARAMETER";
pub const ENV_SHARDING_CONTEXT: &str = "SHARDRUN_SHARDING_CONTEXT";

/// A script command line split into program and arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a command line on unquoted whitespace.
    ///
    /// Single and double quotes group words and are stripped. There are no
    /// escape sequences.
    pub fn parse(line: &str) -> Result<Self, ConfigError> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        let mut quote: Option<char> = None;

        for ch in line.chars() {
            match quote {
                Some(q) if ch == q => quote = None,
                Some(_) => current.push(ch),
                None if ch == '"' || ch == '\'' => {
                    quote = Some(ch);
                    in_word = true;
                }
                None if ch.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                None => {
                    current.push(ch);
                    in_word = true;
                }
            }
        }

        if quote.is_some() {
            return Err(ConfigError::UnterminatedQuote(line.to_string()));
        }
        if in_word {
            words.push(current);
        }

        let mut words = words.into_iter();
        let program = words.next().ok_or(ConfigError::EmptyCommandLine)?;
        Ok(Self {
            program: PathBuf::from(program),
            args: words.collect(),
        })
    }
}

/// Environment entries that expose `ctx` to a script.
///
/// The sharding parameter entry is omitted when the shard has none.
pub fn sharding_env(ctx: &ShardingContext) -> Vec<(&'static str, String)> {
    let mut env = vec![
        (ENV_JOB_NAME, ctx.job_name().to_string()),
        (ENV_TASK_ID, ctx.task_id().to_string()),
        (
            ENV_SHARDING_TOTAL_COUNT,
            ctx.sharding_total_count().to_string(),
        ),
        (ENV_SHARDING_ITEM, ctx.sharding_item().to_string()),
        (ENV_JOB_PARAMETER, ctx.job_parameter().to_string()),
    ];
    if let Some(parameter) = ctx.sharding_parameter() {
        env.push((ENV_SHARDING_PARAMETER, parameter.to_string()));
    }
    match ctx.to_json() {
        Ok(json) => env.push((ENV_SHARDING_CONTEXT, json)),
        Err(err) => warn!(error = %err, "failed to encode sharding context"),
    }
    env
}

/// Launches script jobs and waits for them to exit.
#[derive(Clone, Debug, Default)]
pub struct ScriptInvoker {
    output: ScriptOutput,
    working_dir: Option<PathBuf>,
}

impl ScriptInvoker {
    pub fn new(output: ScriptOutput) -> Self {
        Self {
            output,
            working_dir: None,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            output: config.script_output,
            working_dir: config.script_working_dir.clone(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn output(&self) -> ScriptOutput {
        self.output
    }

    /// Build the child command without spawning it.
    pub fn command(&self, command_line: &CommandLine, ctx: &ShardingContext) -> Command {
        let mut command = Command::new(&command_line.program);
        command.args(&command_line.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        // A value inherited from the parent must not leak into a shard without one.
        command.env_remove(ENV_SHARDING_PARAMETER);
        command.envs(sharding_env(ctx));
        if self.output == ScriptOutput::Capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        command
    }

    /// Run `command_line` for `ctx` and block until it exits.
    pub fn invoke(&self, command_line: &str, ctx: &ShardingContext) -> Result<ScriptOutcome, RunError> {
        let command_line = CommandLine::parse(command_line)?;
        let program = command_line.program.clone();
        let span = script_span(program.display().to_string());
        let _enter = span.enter();

        let mut command = self.command(&command_line, ctx);
        debug!(args = ?command_line.args, "launching script");
        let child = command
            .spawn()
            .map_err(|source| ResolutionError::ScriptLaunch {
                program: program.clone(),
                source,
            })?;

        let wait_error = |source| ExecutionError::ScriptWait {
            program: program.clone(),
            source,
        };
        let outcome = match self.output {
            ScriptOutput::Inherit => {
                let mut child = child;
                let status = child.wait().map_err(wait_error)?;
                finish(&program, status, None, None)?
            }
            ScriptOutput::Capture => {
                let output = child.wait_with_output().map_err(wait_error)?;
                finish(
                    &program,
                    output.status,
                    Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                )?
            }
        };
        Ok(outcome)
    }
}

fn finish(
    program: &Path,
    status: ExitStatus,
    stdout: Option<String>,
    stderr: Option<String>,
) -> Result<ScriptOutcome, ExecutionError> {
    match status.code() {
        Some(0) => {
            info!(program = %program.display(), "script exited successfully");
            Ok(ScriptOutcome {
                exit_code: 0,
                stdout,
                stderr,
            })
        }
        Some(code) => {
            warn!(program = %program.display(), code, "script exited with failure");
            Err(ExecutionError::ScriptExit { code, stderr })
        }
        None => {
            warn!(program = %program.display(), %status, "script terminated by signal");
            Err(ExecutionError::ScriptTerminated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobCoreSettings;

    fn ctx(params: &str, item: u32) -> ShardingContext {
        let settings = JobCoreSettings::builder("TestScriptJob", "*/2 * * * * ?", 3)
            .sharding_item_parameters(params)
            .job_parameter("dbName=dangdang")
            .build()
            .unwrap();
        ShardingContext::build(&settings, item).unwrap()
    }

    #[test]
    fn parses_plain_command_line() {
        let line = CommandLine::parse("  /opt/jobs/run.sh --mode  fast ").unwrap();
        assert_eq!(line.program, PathBuf::from("/opt/jobs/run.sh"));
        assert_eq!(line.args, vec!["--mode", "fast"]);
    }

    #[test]
    fn quotes_group_words() {
        let line = CommandLine::parse(r#"sh -c 'echo "a b"' "" x"y z""#).unwrap();
        assert_eq!(line.program, PathBuf::from("sh"));
        assert_eq!(line.args, vec!["-c", r#"echo "a b""#, "", "xy z"]);
    }

    #[test]
    fn rejects_unterminated_quote_and_blank_line() {
        assert!(matches!(
            CommandLine::parse("sh -c 'echo"),
            Err(ConfigError::UnterminatedQuote(_))
        ));
        assert_eq!(CommandLine::parse("   "), Err(ConfigError::EmptyCommandLine));
    }

    #[test]
    fn env_exposes_context_fields() {
        let env = sharding_env(&ctx("0=Beijing,1=Shanghai", 1));
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get(ENV_JOB_NAME), Some("TestScriptJob"));
        assert_eq!(get(ENV_SHARDING_TOTAL_COUNT), Some("3"));
        assert_eq!(get(ENV_SHARDING_ITEM), Some("1"));
        assert_eq!(get(ENV_JOB_PARAMETER), Some("dbName=dangdang"));
        assert_eq!(get(ENV_SHARDING_PARAMETER), Some("Shanghai"));
        assert!(get(ENV_TASK_ID).unwrap().starts_with("TestScriptJob@-@1@-@"));
        assert!(get(ENV_SHARDING_CONTEXT).unwrap().contains("\"Beijing\""));
    }

    #[test]
    fn env_omits_missing_sharding_parameter() {
        let env = sharding_env(&ctx("0=Beijing", 2));
        assert!(env.iter().all(|(k, _)| *k != ENV_SHARDING_PARAMETER));
    }

    #[test]
    fn command_uses_working_dir_and_capture() {
        let invoker = ScriptInvoker::new(ScriptOutput::Capture).with_working_dir("/tmp");
        assert_eq!(invoker.output(), ScriptOutput::Capture);
        assert_eq!(
            ScriptInvoker::from_config(&RunnerConfig::default()).output(),
            ScriptOutput::Inherit
        );
        let line = CommandLine::parse("run.sh a").unwrap();
        let command = invoker.command(&line, &ctx("", 0));
        assert_eq!(command.get_program(), "run.sh");
        assert_eq!(command.get_current_dir(), Some(Path::new("/tmp")));
        let envs: Vec<_> = command.get_envs().collect();
        assert!(envs
            .iter()
            .any(|(k, v)| *k == ENV_JOB_NAME && v.map(|v| v == "TestScriptJob").unwrap_or(false)));
        assert!(envs
            .iter()
            .any(|(k, v)| *k == ENV_SHARDING_PARAMETER && v.is_none()));
    }

    #[cfg(unix)]
    #[test]
    fn captures_output_of_successful_script() {
        let invoker = ScriptInvoker::new(ScriptOutput::Capture);
        let outcome = invoker
            .invoke(
                r#"sh -c 'echo "$SHARDRUN_SHARDING_ITEM/$SHARDRUN_SHARDING_TOTAL_COUNT"'"#,
                &ctx("", 2),
            )
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.as_deref(), Some("2/3\n"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_execution_error() {
        let invoker = ScriptInvoker::new(ScriptOutput::Capture);
        let err = invoker
            .invoke("sh -c 'echo broken >&2; exit 7'", &ctx("", 0))
            .unwrap_err();
        match err {
            RunError::Execution(ExecutionError::ScriptExit { code, stderr }) => {
                assert_eq!(code, 7);
                assert_eq!(stderr.as_deref(), Some("broken\n"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_resolution_error() {
        let invoker = ScriptInvoker::default();
        let err = invoker
            .invoke("/definitely/not/here/job.sh", &ctx("", 0))
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Resolution(ResolutionError::ScriptLaunch { .. })
        ));
    }
}
