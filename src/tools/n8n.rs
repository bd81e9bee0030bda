//! n8n workflow tool - manage workflows through the n8n REST API
//!
//! Credentials come from a small JSON file loaded at construction; a tool
//! that cannot load them is never built. Requests go through a
//! [`Transport`]: the async reqwest client normally, or reqwest's blocking
//! client on the blocking pool when configured or when the async client
//! cannot be built. Both produce the same outcomes.

use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::config::{self, TransportKind};
use crate::error::Error;
use crate::Result;
use super::args;
use super::deadline::bounded;
use super::response::format_body;
use super::{Outcome, Subject, Tool};

const API_KEY_HEADER: &str = "X-N8N-API-KEY";
const ACTIONS: [&str; 6] = ["list", "get", "create", "update", "execute", "delete"];

/// One call against the n8n API
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub api_key: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportFailure {
    TimedOut,
    Failed(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportFailure::TimedOut
        } else {
            TransportFailure::Failed(e.to_string())
        }
    }
}

/// Sends an [`ApiRequest`] and returns status and body text
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn send(&self, request: ApiRequest, timeout: Duration) -> std::result::Result<(u16, String), TransportFailure>;
}

struct AsyncTransport {
    client: reqwest::Client,
}

#[async_trait]
impl Transport for AsyncTransport {
    fn kind(&self) -> TransportKind { TransportKind::Async }

    async fn send(&self, request: ApiRequest, timeout: Duration) -> std::result::Result<(u16, String), TransportFailure> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(timeout)
            .header("accept", "application/json")
            .header(API_KEY_HEADER, &request.api_key)
            .header("Content-Type", "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

/// reqwest's blocking client, run on the blocking thread pool.
///
/// The client is built and dropped inside the blocking task because the
/// blocking client may not be dropped from async context.
struct BlockingTransport;

#[async_trait]
impl Transport for BlockingTransport {
    fn kind(&self) -> TransportKind { TransportKind::Blocking }

    async fn send(&self, request: ApiRequest, timeout: Duration) -> std::result::Result<(u16, String), TransportFailure> {
        let task = tokio::task::spawn_blocking(move || {
            let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
            let mut builder = client
                .request(request.method, &request.url)
                .header("accept", "application/json")
                .header(API_KEY_HEADER, &request.api_key)
                .header("Content-Type", "application/json");
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send()?;
            let status = response.status().as_u16();
            let text = response.text()?;
            Ok::<_, TransportFailure>((status, text))
        });

        task.await
            .map_err(|e| TransportFailure::Failed(format!("blocking request task failed: {}", e)))?
    }
}

fn build_transport(kind: TransportKind) -> Box<dyn Transport> {
    match kind {
        TransportKind::Blocking => Box::new(BlockingTransport),
        TransportKind::Async => match reqwest::Client::builder().build() {
            Ok(client) => Box::new(AsyncTransport { client }),
            Err(e) => {
                warn!("Async HTTP client unavailable ({}), n8n falls back to blocking transport", e);
                Box::new(BlockingTransport)
            }
        },
    }
}

/// Manage n8n workflows via REST API
pub struct N8nTool {
    api_url: url::Url,
    api_key: String,
    timeout: Duration,
    transport: Box<dyn Transport>,
}

impl N8nTool {
    /// Load credentials from `config_path`. Fails before any network call
    /// when the file is missing or incomplete.
    pub fn new(config_path: &Path, timeout: Duration, transport: TransportKind) -> Result<Self> {
        let (raw_url, api_key) = config::load_n8n_credentials(config_path)?;
        let api_url = url::Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("Invalid apiUrl '{}': {}", raw_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid apiUrl '{}': not a base URL", raw_url)));
        }
        debug!("n8n configured for {} ({:?} transport)", api_url, transport);
        Ok(Self {
            api_url,
            api_key,
            timeout,
            transport: build_transport(transport),
        })
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// API base plus `segments`, each percent-encoded as a single path segment
    fn endpoint(&self, segments: &[&str], active: Option<&str>) -> url::Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let Some(active) = active {
            url.query_pairs_mut().append_pair("active", active);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        url: url::Url,
        body: Option<Value>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let request = ApiRequest {
            method,
            url: url.to_string(),
            api_key: self.api_key.clone(),
            body,
        };
        debug!("n8n {} {}", request.method, request.url);

        let sent = bounded(
            self.transport.send(request, self.timeout),
            self.timeout,
            cancel,
            Subject::Request,
        )
        .await;

        match sent {
            Ok(Ok((status, text))) => {
                let body = format_body(&text);
                Outcome::http(format!("Status: {}\n{}", status, body.text), status)
            }
            Ok(Err(TransportFailure::TimedOut)) => Outcome::TimedOut {
                subject: Subject::Request,
                after: self.timeout,
            },
            Ok(Err(TransportFailure::Failed(e))) => Outcome::transport("n8n request failed", e),
            Err(interrupted) => interrupted,
        }
    }

    async fn run(&self, params: &Value, cancel: &CancellationToken) -> std::result::Result<Outcome, Outcome> {
        let action = args::required_str(params, "action", None)?;

        let outcome = match action {
            "list" => {
                let active = args::optional_str(params, "active").unwrap_or("true");
                let filter = match active {
                    "all" => None,
                    "true" | "false" => Some(active),
                    other => {
                        return Err(Outcome::invalid(
                            "active",
                            format!("Invalid 'active' value '{}', use true, false or all", other),
                        ))
                    }
                };
                let url = self.endpoint(&["workflows"], filter);
                self.request(Method::GET, url, None, cancel).await
            }
            "get" => {
                let id = workflow_id(params, action)?;
                let url = self.endpoint(&["workflows", id], None);
                self.request(Method::GET, url, None, cancel).await
            }
            "create" => {
                let data = workflow_data(params, action)?;
                let url = self.endpoint(&["workflows"], None);
                self.request(Method::POST, url, Some(data), cancel).await
            }
            "update" => {
                let id = workflow_id(params, action)?;
                let data = workflow_data(params, action)?;
                let url = self.endpoint(&["workflows", id], None);
                self.request(Method::PATCH, url, Some(data), cancel).await
            }
            "execute" => {
                let id = workflow_id(params, action)?;
                let url = self.endpoint(&["workflows", id, "execute"], None);
                self.request(Method::POST, url, None, cancel).await
            }
            "delete" => {
                let id = workflow_id(params, action)?;
                let url = self.endpoint(&["workflows", id], None);
                self.request(Method::DELETE, url, None, cancel).await
            }
            other => {
                return Err(Outcome::invalid(
                    "action",
                    format!("Unknown action '{}'. Use one of: {}", other, ACTIONS.join(", ")),
                ))
            }
        };
        Ok(outcome)
    }
}

/// The workflow id; `.` and `..` would be dropped as path segments
fn workflow_id<'a>(params: &'a Value, action: &str) -> std::result::Result<&'a str, Outcome> {
    let id = args::required_str(params, "id", Some(action))?;
    if id == "." || id == ".." {
        return Err(Outcome::invalid("id", format!("Invalid workflow id '{}'", id)));
    }
    Ok(id)
}

/// `data` as embedded JSON text, or already-structured JSON
fn workflow_data(params: &Value, action: &str) -> std::result::Result<Value, Outcome> {
    match params.get("data") {
        Some(Value::String(s)) if !s.trim().is_empty() => serde_json::from_str(s)
            .map_err(|_| Outcome::invalid("data", "Invalid JSON in 'data' parameter")),
        Some(value @ (Value::Object(_) | Value::Array(_))) => Ok(value.clone()),
        _ => Err(Outcome::missing("data", Some(action))),
    }
}

#[async_trait]
impl Tool for N8nTool {
    fn name(&self) -> &str { "exec_n8n" }

    fn description(&self) -> &str {
        "Manage n8n workflows via REST API. Available actions:\n\
         - list: List all workflows (active=true|false|all)\n\
         - get: Get a specific workflow by ID\n\
         - create: Create a new workflow from JSON\n\
         - update: Update a workflow by ID\n\
         - execute: Execute a workflow by ID\n\
         - delete: Delete a workflow by ID\n\n\
         Examples:\n\
         - List all workflows: action=list active=all\n\
         - Get workflow: action=get id=abc123\n\
         - Execute workflow: action=execute id=abc123\n\
         - Create workflow: action=create data='{\"name\": \"My flow\", \"nodes\": [], \"connections\": {}}'"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ACTIONS,
                    "description": "The action to perform"
                },
                "active": {
                    "type": "string",
                    "enum": ["true", "false", "all"],
                    "description": "Filter by active status (for list action)",
                    "default": "true"
                },
                "id": {
                    "type": "string",
                    "description": "Workflow ID (for get, update, execute, delete)"
                },
                "data": {
                    "type": "string",
                    "description": "JSON data for create/update actions"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, params: Value, cancel: &CancellationToken) -> Outcome {
        self.run(&params, cancel).await.unwrap_or_else(|outcome| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_config(tmp: &TempDir, body: &str) -> std::path::PathBuf {
        let path = tmp.path().join("n8n-config.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn tool_for(server: &MockServer, tmp: &TempDir, kind: TransportKind) -> N8nTool {
        let path = write_config(
            tmp,
            &json!({"apiUrl": format!("{}/api/v1", server.uri()), "apiKey": "secret"}).to_string(),
        );
        N8nTool::new(&path, Duration::from_secs(5), kind).unwrap()
    }

    #[tokio::test]
    async fn test_config_without_key_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, &json!({"apiUrl": server.uri()}).to_string());
        let result = N8nTool::new(&path, Duration::from_secs(5), TransportKind::Async);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_config_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = N8nTool::new(&tmp.path().join("absent.json"), Duration::from_secs(5), TransportKind::Async);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_list_defaults_to_active() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workflows"))
            .and(query_param("active", "true"))
            .and(header("X-N8N-API-KEY", "secret"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let result = tool_for(&server, &tmp, TransportKind::Async)
            .call(json!({"action": "list"}))
            .await;
        assert_eq!(result, "Status: 200\n{\n  \"data\": []\n}");
    }

    #[tokio::test]
    async fn test_get_requires_id() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let tool = tool_for(&server, &tmp, TransportKind::Async);

        for action in ["get", "update", "execute", "delete"] {
            let result = tool.call(json!({"action": action})).await;
            assert_eq!(result, format!("Error: 'id' parameter required for {} action", action));
        }
    }

    #[tokio::test]
    async fn test_create_requires_valid_data() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let tool = tool_for(&server, &tmp, TransportKind::Async);

        let result = tool.call(json!({"action": "create"})).await;
        assert_eq!(result, "Error: 'data' parameter required for create action");

        let result = tool.call(json!({"action": "create", "data": "{broken"})).await;
        assert_eq!(result, "Error: Invalid JSON in 'data' parameter");

        let result = tool.call(json!({"action": "update", "id": "7"})).await;
        assert_eq!(result, "Error: 'data' parameter required for update action");
    }

    #[tokio::test]
    async fn test_unknown_action_and_missing_action() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let tool = tool_for(&server, &tmp, TransportKind::Async);

        let result = tool.call(json!({"action": "archive"})).await;
        assert!(result.starts_with("Error: Unknown action 'archive'"));

        let result = tool.call(json!({})).await;
        assert_eq!(result, "Error: 'action' parameter required");
    }

    #[tokio::test]
    async fn test_update_patches_with_data() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/v1/workflows/wf1"))
            .and(body_json(json!({"name": "renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"wf1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let result = tool_for(&server, &tmp, TransportKind::Async)
            .call(json!({"action": "update", "id": "wf1", "data": "{\"name\": \"renamed\"}"}))
            .await;
        assert!(result.starts_with("Status: 200\n"));
        assert!(result.contains("\"id\": \"wf1\""));
    }

    #[tokio::test]
    async fn test_execute_and_delete_paths() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/workflows/abc/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_string("started"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/workflows/abc"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"not found"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let tool = tool_for(&server, &tmp, TransportKind::Async);

        let result = tool.call(json!({"action": "execute", "id": "abc"})).await;
        assert_eq!(result, "Status: 200\nstarted");

        let result = tool.call(json!({"action": "delete", "id": "abc"})).await;
        assert!(result.starts_with("Status: 404\n"));
        assert!(result.contains("not found"));
    }

    #[tokio::test]
    async fn test_id_stays_inside_workflows() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/credentials/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wrong endpoint"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/workflows/..%2Fcredentials%2Fc1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such workflow"))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let result = tool_for(&server, &tmp, TransportKind::Async)
            .call(json!({"action": "delete", "id": "../credentials/c1"}))
            .await;
        assert_eq!(result, "Status: 404\nno such workflow");
    }

    #[tokio::test]
    async fn test_id_query_characters_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workflows/a%3Factive=false%23x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("one"))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let result = tool_for(&server, &tmp, TransportKind::Async)
            .call(json!({"action": "get", "id": "a?active=false#x"}))
            .await;
        assert_eq!(result, "Status: 200\none");
    }

    #[tokio::test]
    async fn test_dot_ids_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let tool = tool_for(&server, &tmp, TransportKind::Async);
        for id in [".", ".."] {
            let result = tool.call(json!({"action": "delete", "id": id})).await;
            assert_eq!(result, format!("Error: Invalid workflow id '{}'", id));
        }
    }

    #[tokio::test]
    async fn test_blocking_transport_matches_async() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workflows"))
            .and(header("X-N8N-API-KEY", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[{"id":"1"}]}"#))
            .expect(2)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let async_tool = tool_for(&server, &tmp, TransportKind::Async);
        let blocking_tool = tool_for(&server, &tmp, TransportKind::Blocking);
        assert_eq!(blocking_tool.transport_kind(), TransportKind::Blocking);

        let params = json!({"action": "list", "active": "all"});
        let a = async_tool.call(params.clone()).await;
        let b = blocking_tool.call(params).await;
        assert_eq!(a, b);
        assert!(a.contains("\"id\": \"1\""));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            &json!({"apiUrl": server.uri(), "apiKey": "secret"}).to_string(),
        );
        let tool = N8nTool::new(&path, Duration::from_secs(1), TransportKind::Async).unwrap();
        let result = tool.call(json!({"action": "get", "id": "slow"})).await;
        assert_eq!(result, "Error: Request timed out after 1 seconds");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on port 9 locally.
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            &json!({"apiUrl": "http://127.0.0.1:9/api/v1", "apiKey": "secret"}).to_string(),
        );
        let tool = N8nTool::new(&path, Duration::from_secs(5), TransportKind::Async).unwrap();
        let result = tool.call(json!({"action": "list"})).await;
        assert!(result.starts_with("Error: n8n request failed"), "{}", result);
    }
}
