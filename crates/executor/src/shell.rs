//! Shell executor - run a local command
//!
//! # Parameters
//!
//! | Name      | Type               | Required |
//! |-----------|--------------------|----------|
//! | `command` | string             | yes      |
//! | `args`    | sequence of string | no       |
//!
//! The fingerprint is the MD5 of the command string alone, so two actions
//! running the same binary with different arguments deduplicate together.

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::hash::md5_hex;
use crate::params::{require_string, Params, ParamValue};
use crate::{ExecutorError, Result, Task, TaskExecutor, TaskMeta};

const PARAM_COMMAND: &str = "command";
const PARAM_ARGS: &str = "args";

/// Executor for local shell commands.
pub struct ShellExecutor;

impl ShellExecutor {
    /// Create the shell executor.
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for ShellExecutor {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn validate_parameters(&self, params: &Params) -> Result<()> {
        require_string(params, PARAM_COMMAND)?;

        if let Some(args) = params.get(PARAM_ARGS) {
            if args.as_sequence().is_none() {
                return Err(ExecutorError::InvalidParameter {
                    param: PARAM_ARGS.to_owned(),
                    expected: "sequence",
                });
            }
        }

        Ok(())
    }

    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task> {
        let command = params
            .get(PARAM_COMMAND)
            .and_then(ParamValue::as_str)
            .unwrap_or_default()
            .to_owned();

        // Non-string sequence elements are dropped, same as during rendering.
        let args = params
            .get(PARAM_ARGS)
            .and_then(ParamValue::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();

        Box::new(ShellTask {
            meta,
            command,
            args,
        })
    }
}

struct ShellTask {
    meta: TaskMeta,
    command: String,
    args: Vec<String>,
}

#[async_trait]
impl Task for ShellTask {
    fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    fn executor_name(&self) -> &'static str {
        "shell"
    }

    fn details(&self) -> serde_json::Value {
        json!({ "command": self.command })
    }

    fn fingerprint(&self) -> String {
        md5_hex(&self.command)
    }

    async fn exec(&self) -> Result<()> {
        let output = Command::new(&self.command).args(&self.args).output().await?;

        if !output.status.success() {
            return Err(ExecutorError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(())
    }
}
