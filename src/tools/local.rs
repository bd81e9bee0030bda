//! Local shell tool - run commands on this host

use std::path::PathBuf;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use super::args;
use super::process::{ProcessRunner, ProcessSpec};
use super::{Outcome, Tool};

/// Execute shell commands locally
pub struct LocalTool {
    working_dir: PathBuf,
    runner: ProcessRunner,
}

impl LocalTool {
    pub fn new(working_dir: PathBuf, timeout: Duration, grace: Duration) -> Self {
        Self {
            working_dir,
            runner: ProcessRunner::new(timeout, grace),
        }
    }
}

#[async_trait]
impl Tool for LocalTool {
    fn name(&self) -> &str { "exec_local" }
    fn description(&self) -> &str { "Execute a local shell command." }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, params: Value, cancel: &CancellationToken) -> Outcome {
        let command = match args::required_str(&params, "command", None) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };

        let spec = ProcessSpec::shell(command).current_dir(&self.working_dir);
        self.runner.run(&spec, cancel).await
    }
}
