//! Agent Zero HTTP tool - send a message to a local Agent Zero instance
//!
//! Every call does its own handshake: `GET /csrf_token` yields a token and
//! session cookies, which are attached to the `POST /message` that follows.
//! Nothing from the handshake outlives the call.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::error::Error;
use crate::Result;
use super::args;
use super::deadline::bounded;
use super::{Outcome, Subject, Tool};

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    context: Value,
}

/// Handshake artifacts, scoped to one call
struct Session {
    token: String,
    cookies: Option<String>,
}

/// Talk to Agent Zero over its HTTP API
pub struct AgentZeroTool {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
    handshake_timeout: Duration,
}

impl AgentZeroTool {
    /// Fails when no API key is configured
    pub fn new(
        api_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Agent Zero API key missing: set agent_zero.api_key or {}",
                    crate::config::AGENT_ZERO_KEY_ENV
                ))
            })?;

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
            handshake_timeout,
        })
    }

    async fn handshake(&self, cancel: &CancellationToken) -> std::result::Result<Session, Outcome> {
        let url = format!("{}/csrf_token", self.api_url);
        debug!("Agent Zero handshake: GET {}", url);

        let exchange = async {
            let response = self
                .client
                .get(&url)
                .header("Origin", &self.api_url)
                .send()
                .await?;
            let status = response.status().as_u16();
            let cookies = cookie_header(response.headers());
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, cookies, body))
        };

        let (status, cookies, body) = bounded(exchange, self.handshake_timeout, cancel, Subject::Request)
            .await?
            .map_err(|e| Outcome::transport("Agent Zero request failed", e))?;

        if status != 200 {
            return Err(Outcome::protocol(format!(
                "Failed to get CSRF token (status {})",
                status
            )));
        }

        let csrf: CsrfResponse = serde_json::from_str(&body)
            .map_err(|e| Outcome::protocol(format!("Failed to parse JSON response: {}", e)))?;
        if !csrf.ok {
            return Err(Outcome::protocol(
                csrf.error.unwrap_or_else(|| "Unknown CSRF error".to_string()),
            ));
        }
        let token = csrf
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Outcome::protocol("CSRF response did not include a token"))?;

        Ok(Session { token, cookies })
    }

    async fn run(&self, params: &Value, cancel: &CancellationToken) -> std::result::Result<Outcome, Outcome> {
        let message = args::required_str(params, "message", None)?;
        let context = args::optional_str(params, "context");
        let timeout = args::optional_secs(params, "timeout")?.unwrap_or(self.timeout);

        let session = self.handshake(cancel).await?;

        let mut payload = json!({ "text": message });
        if let Some(context) = context {
            payload["context"] = Value::String(context.to_string());
        }

        let url = format!("{}/message", self.api_url);
        debug!("Agent Zero: POST {} (timeout {:?})", url, timeout);

        let mut request = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-CSRF-Token", &session.token)
            .header("Origin", &self.api_url)
            .json(&payload);
        if let Some(cookies) = &session.cookies {
            request = request.header(COOKIE, cookies);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = bounded(exchange, timeout, cancel, Subject::Request)
            .await?
            .map_err(|e| Outcome::transport("Agent Zero request failed", e))?;

        if status != 200 {
            return Err(Outcome::protocol(format!(
                "Failed to send message (status {})",
                status
            )));
        }

        let reply: MessageResponse = serde_json::from_str(&body)
            .map_err(|e| Outcome::protocol(format!("Failed to parse JSON response: {}", e)))?;

        let text = [
            format!("🔌 Agent Zero Response (Context: {})", plain(&reply.context)),
            String::new(),
            plain(&reply.message),
        ]
        .join("\n");
        Ok(Outcome::http(text, status))
    }
}

/// `name=value` pairs from every Set-Cookie header, joined for a Cookie header
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Tool for AgentZeroTool {
    fn name(&self) -> &str { "exec_agent_zero" }

    fn description(&self) -> &str {
        "Execute commands in Agent Zero environment via HTTP API.\n\n\
         Agent Zero is a powerful AI agent with tools for:\n\
         - Code execution and file operations\n\
         - Web browsing and scraping\n\
         - Task automation and scheduling\n\
         - Multi-agent collaboration\n\n\
         Use this for complex coding tasks, web automation, or when you need advanced AI capabilities.\n\n\
         Parameters:\n\
         - message: The message to send to Agent Zero\n\
         - context: Optional context ID to continue a conversation (default: new context)\n\
         - timeout: Timeout in seconds for the request (default: 120)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message or task to send to Agent Zero"
                },
                "context": {
                    "type": "string",
                    "description": "Optional context ID to continue an existing conversation"
                },
                "timeout": {
                    "type": "number",
                    "description": "Timeout in seconds for the request",
                    "default": self.timeout.as_secs()
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, params: Value, cancel: &CancellationToken) -> Outcome {
        self.run(&params, cancel).await.unwrap_or_else(|outcome| outcome)
    }
}
