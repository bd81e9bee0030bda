//! `opencode agent` wrapper

use std::path::PathBuf;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use super::args;
use super::process::{ProcessRunner, ProcessSpec};
use super::{Outcome, Tool};

/// Manage OpenCode agents through the `opencode agent` subcommand
pub struct ZeroAgentTool {
    working_dir: PathBuf,
    runner: ProcessRunner,
}

impl ZeroAgentTool {
    pub fn new(working_dir: PathBuf, timeout: Duration, grace: Duration) -> Self {
        Self {
            working_dir,
            runner: ProcessRunner::new(timeout, grace),
        }
    }

    fn spec(&self, command: &str) -> ProcessSpec {
        ProcessSpec::shell(&format!("opencode agent {}", command)).current_dir(&self.working_dir)
    }
}

#[async_trait]
impl Tool for ZeroAgentTool {
    fn name(&self) -> &str { "exec_zero_agent" }

    fn description(&self) -> &str {
        "Execute OpenCode Agent Zero commands (opencode agent). For example: 'agent list', \
         'agent attach <url>', or 'opencode agent' for interactive agent management."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The OpenCode Agent Zero command to execute. Examples: 'agent list', \
                                    'agent attach http://localhost:4096', 'opencode agent' for interactive management."
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

        self.runner.run(&self.spec(command), cancel).await
    }
}
