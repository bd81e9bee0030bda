//! Mode switching tool
//!
//! The selected mode lives in a [`SessionMode`] handle shared with the
//! agent runtime, which decides how the next message is routed.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;
use super::args;
use super::{Outcome, Tool};

/// How the runtime handles the next message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Local shell commands
    Local,
    /// Agent Zero via Docker
    Agent,
    /// Plain LLM chat
    #[default]
    Default,
}

impl Mode {
    fn description(self) -> &'static str {
        match self {
            Mode::Local => "Local shell commands",
            Mode::Agent => "Agent Zero via Docker",
            Mode::Default => "Default LLM chat",
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            Mode::Local => "💻",
            Mode::Agent => "🤖",
            Mode::Default => "💬",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Local => "local",
            Mode::Agent => "agent",
            Mode::Default => "default",
        })
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Mode::Local),
            "agent" => Ok(Mode::Agent),
            "default" => Ok(Mode::Default),
            _ => Err(()),
        }
    }
}

/// Shared, cloneable handle to the current mode
#[derive(Debug, Clone, Default)]
pub struct SessionMode(Arc<RwLock<Mode>>);

impl SessionMode {
    pub fn new(mode: Mode) -> Self {
        Self(Arc::new(RwLock::new(mode)))
    }

    pub fn get(&self) -> Mode {
        // A poisoned lock still holds a valid Mode.
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, mode: Mode) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = mode;
    }
}

/// Switch between interaction modes
pub struct ModeTool {
    mode: SessionMode,
}

impl ModeTool {
    pub fn new(mode: SessionMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Tool for ModeTool {
    fn name(&self) -> &str { "switch_mode" }

    fn description(&self) -> &str {
        "Switch between different interaction modes:\n\
         - local: Local shell commands (no Agent Zero)\n\
         - agent: Agent Zero via Docker commands\n\
         - default: Default LLM chat mode"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "description": "Mode to switch to (local/agent/default)",
                    "enum": ["local", "agent", "default"]
                }
            },
            "required": ["mode"]
        })
    }

    async fn execute(&self, params: Value, _cancel: &CancellationToken) -> Outcome {
        let raw = match args::required_str(&params, "mode", None) {
            Ok(raw) => raw,
            Err(outcome) => return outcome,
        };
        let Ok(mode) = raw.trim().to_lowercase().parse::<Mode>() else {
            return Outcome::invalid("mode", "Invalid mode. Use 'local', 'agent', or 'default'.");
        };

        self.mode.set(mode);
        info!("Switched to {} mode", mode);

        Outcome::text(format!(
            "Switched to {} mode {}\nNext message will be processed in {} mode.",
            mode.description(),
            mode.emoji(),
            mode
        ))
    }
}
