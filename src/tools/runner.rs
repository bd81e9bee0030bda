//! Tool runner - manages and executes tools

use std::collections::HashMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::config::Config;
use crate::Result;
use crate::error::Error;
use super::{
    AgentZeroDockerTool, AgentZeroTool, HttpRequestTool, LocalTool, ModeTool, N8nTool,
    SessionMode, Tool, ZeroAgentTool,
};

/// Tool definition for LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    tools: HashMap<String, Box<dyn Tool>>,
    unavailable: Vec<(String, String)>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            unavailable: Vec::new(),
        }
    }

    /// Create a tool runner with every tool the configuration allows.
    ///
    /// Tools whose construction fails (missing n8n credentials, no Agent
    /// Zero API key) are left out and listed by [`ToolRunner::unavailable`].
    pub fn from_config(config: &Config, mode: SessionMode) -> Self {
        let mut runner = Self::new();
        let grace = Duration::from_millis(config.kill_grace_ms);

        // Command tools
        runner.register(LocalTool::new(
            config.local_working_dir(),
            Duration::from_secs(config.local.timeout_secs),
            grace,
        ));
        runner.register(AgentZeroDockerTool::new(
            config.docker.container.clone(),
            config.docker.project_dir.clone(),
            Duration::from_secs(config.docker.timeout_secs),
            grace,
        ));
        runner.register(ZeroAgentTool::new(
            config.opencode.working_dir.clone(),
            Duration::from_secs(config.opencode.timeout_secs),
            grace,
        ));

        // HTTP tools
        let http = HttpRequestTool::new(
            Duration::from_secs(config.http.timeout_secs),
            config.http.user_agent.clone(),
        );
        runner.register_fallible("http_request", http);

        let n8n = N8nTool::new(
            &config.n8n.config_path,
            Duration::from_secs(config.n8n.timeout_secs),
            config.n8n.transport,
        );
        runner.register_fallible("exec_n8n", n8n);

        let agent_zero = AgentZeroTool::new(
            &config.agent_zero.api_url,
            config.agent_zero.api_key.as_deref(),
            Duration::from_secs(config.agent_zero.timeout_secs),
            Duration::from_secs(config.agent_zero.handshake_timeout_secs),
        );
        runner.register_fallible("exec_agent_zero", agent_zero);

        // Session
        runner.register(ModeTool::new(mode));

        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!("Tool {} registered twice, replacing the earlier one", name);
        }
        self.tools.insert(name, Box::new(tool));
    }

    /// Register the result of a fallible construction, or record why it failed
    pub fn register_fallible<T: Tool + 'static>(&mut self, name: &str, tool: Result<T>) {
        match tool {
            Ok(tool) => self.register(tool),
            Err(e) => {
                warn!("Tool {} unavailable: {}", name, e);
                self.unavailable.push((name.to_string(), e.to_string()));
            }
        }
    }

    /// Get tool definitions for LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self.tools.values()
            .map(|t| t.to_definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        self.execute_with_cancel(name, params, &CancellationToken::new()).await
    }

    /// Execute a tool by name, aborting its external action when `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        name: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let tool = self.tools.get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        debug!("Executing tool: {} with args: {}", name, params);
        let outcome = tool.execute(params, cancel).await;
        if outcome.is_success() {
            debug!("Tool {} succeeded", name);
        } else {
            debug!("Tool {} failed: {}", name, outcome);
        }
        Ok(outcome.render())
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Tools that could not be constructed, with the reason
    pub fn unavailable(&self) -> &[(String, String)] {
        &self.unavailable
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DummyTool, Mode};
    use serde_json::json;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.workspace = tmp.path().to_path_buf();
        config.n8n.config_path = tmp.path().join("n8n-config.json");
        config.agent_zero.api_key = Some("test-key".to_string());
        config
    }

    fn full_runner(tmp: &TempDir) -> ToolRunner {
        let config = config_in(tmp);
        std::fs::write(
            &config.n8n.config_path,
            r#"{"apiUrl": "http://127.0.0.1:5678/api/v1", "apiKey": "k"}"#,
        )
        .unwrap();
        ToolRunner::from_config(&config, SessionMode::default())
    }

    #[tokio::test]
    async fn test_tool_runner_register_and_execute() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool {
            name: "test_tool".to_string(),
            result: "success".to_string(),
        });

        assert!(runner.has("test_tool"));

        let result = runner.execute("test_tool", json!({})).await.unwrap();
        assert_eq!(result, "success");
    }

    #[tokio::test]
    async fn test_tool_runner_unknown_tool() {
        let runner = ToolRunner::new();
        let result = runner.execute("unknown", json!({})).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config_registers_everything() {
        let tmp = TempDir::new().unwrap();
        let runner = full_runner(&tmp);

        assert!(runner.unavailable().is_empty(), "{:?}", runner.unavailable());
        assert_eq!(
            runner.tool_names(),
            vec![
                "exec_agent_zero",
                "exec_agent_zero_docker",
                "exec_local",
                "exec_n8n",
                "exec_zero_agent",
                "http_request",
                "switch_mode",
            ]
        );
    }

    #[test]
    fn test_missing_n8n_config_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(&tmp);
        config.agent_zero.api_key = None;
        let runner = ToolRunner::from_config(&config, SessionMode::default());

        assert!(!runner.has("exec_n8n"));
        assert!(!runner.has("exec_agent_zero"));
        assert!(runner.has("exec_local"));

        let names: Vec<&str> = runner.unavailable().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["exec_n8n", "exec_agent_zero"]);
        assert!(runner.unavailable()[0].1.contains("not found"));
    }

    #[test]
    fn test_definitions_are_well_formed() {
        let tmp = TempDir::new().unwrap();
        let runner = full_runner(&tmp);

        let definitions = runner.definitions();
        let names: HashSet<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), definitions.len());

        for def in &definitions {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");

            let properties = def.parameters["properties"].as_object().unwrap();
            let required = def.parameters["required"].as_array().unwrap();
            assert!(!required.is_empty(), "{} has no required keys", def.name);
            for key in required {
                let key = key.as_str().unwrap();
                assert!(properties.contains_key(key), "{}: {} not in properties", def.name, key);
            }
        }

        assert_eq!(runner.definitions(), definitions);
    }

    #[tokio::test]
    async fn test_missing_required_key_is_reported() {
        let tmp = TempDir::new().unwrap();
        let runner = full_runner(&tmp);

        for def in runner.definitions() {
            let result = runner.execute(&def.name, json!({})).await.unwrap();
            assert!(result.starts_with("Error:"), "{}: {}", def.name, result);

            let required = def.parameters["required"][0].as_str().unwrap();
            assert!(result.contains(required), "{}: {}", def.name, result);
        }
    }

    #[tokio::test]
    async fn test_mode_tool_shares_session() {
        let tmp = TempDir::new().unwrap();
        let session = SessionMode::default();
        let runner = ToolRunner::from_config(&config_in(&tmp), session.clone());

        runner.execute("switch_mode", json!({"mode": "agent"})).await.unwrap();
        assert_eq!(session.get(), Mode::Agent);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_with_cancel() {
        let tmp = TempDir::new().unwrap();
        let runner = full_runner(&tmp);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = runner
            .execute_with_cancel("exec_local", json!({"command": "sleep 5"}), &cancel)
            .await
            .unwrap();
        assert_eq!(result, "Error: Command cancelled");
    }
}
