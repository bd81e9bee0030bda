//! Agent Zero through `docker exec`

use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use super::args;
use super::process::{ProcessRunner, ProcessSpec};
use super::{Outcome, Tool};

/// Run a command inside the Agent Zero container, with its venv active
pub struct AgentZeroDockerTool {
    container: String,
    project_dir: String,
    runner: ProcessRunner,
}

impl AgentZeroDockerTool {
    pub fn new(container: String, project_dir: String, timeout: Duration, grace: Duration) -> Self {
        Self {
            container,
            project_dir,
            runner: ProcessRunner::new(timeout, grace),
        }
    }

    fn spec(&self, command: &str) -> ProcessSpec {
        // docker gets the script as one argv entry; only bash inside the
        // container parses it.
        let script = format!(
            "cd {} && source venv/bin/activate && {}",
            self.project_dir, command
        );
        ProcessSpec::new("docker")
            .arg("exec")
            .arg(self.container.as_str())
            .arg("bash")
            .arg("-c")
            .arg(script)
    }
}

#[async_trait]
impl Tool for AgentZeroDockerTool {
    fn name(&self) -> &str { "exec_agent_zero_docker" }
    fn description(&self) -> &str { "Execute a command in Agent Zero Docker container." }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute in Agent Zero"
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

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> AgentZeroDockerTool {
        AgentZeroDockerTool::new(
            "agent-zero".to_string(),
            "/srv/agent-zero".to_string(),
            Duration::from_secs(5),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_spec_wraps_command() {
        let spec = tool().spec("python run.py --fast");
        assert_eq!(
            spec.args(),
            &[
                "exec",
                "agent-zero",
                "bash",
                "-c",
                "cd /srv/agent-zero && source venv/bin/activate && python run.py --fast",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_command() {
        let result = tool().call(json!({"command": ""})).await;
        assert_eq!(result, "Error: 'command' parameter required");
    }
}
