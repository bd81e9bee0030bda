//! Tools module - external actions
//!
//! Every tool describes itself (name, description, JSON Schema) and runs one
//! bounded external action per call. Failures come back as an [`Outcome`]
//! variant rather than an error, so a dispatcher can always hand the
//! rendered text to the model.

mod args;
mod deadline;
mod outcome;
mod process;
mod response;
mod runner;
mod local;
mod docker;
mod opencode;
mod http;
mod n8n;
mod agent_zero;
mod mode;

pub use outcome::{Outcome, Subject, ERROR_PREFIX};
pub use response::MAX_TEXT_CHARS;
pub use runner::{ToolRunner, ToolDefinition};
pub use local::LocalTool;
pub use docker::AgentZeroDockerTool;
pub use opencode::ZeroAgentTool;
pub use http::HttpRequestTool;
pub use n8n::N8nTool;
pub use agent_zero::AgentZeroTool;
pub use mode::{Mode, ModeTool, SessionMode};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Tool trait - interface for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Run the tool. Never fails: every failure is an `Outcome` variant.
    async fn execute(&self, params: Value, cancel: &CancellationToken) -> Outcome;

    /// Run without external cancellation and render the result
    async fn call(&self, params: Value) -> String {
        self.execute(params, &CancellationToken::new()).await.render()
    }

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Dummy tool for testing
#[cfg(test)]
pub struct DummyTool {
    pub name: String,
    pub result: String,
}

#[cfg(test)]
#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Dummy tool for testing" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object", "properties": {}}) }

    async fn execute(&self, _params: Value, _cancel: &CancellationToken) -> Outcome {
        Outcome::text(self.result.clone())
    }
}
