//! HTTP request tool - call arbitrary web endpoints

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::Result;
use super::args;
use super::deadline::bounded;
use super::response::format_body;
use super::{Outcome, Subject, Tool};

/// Make HTTP requests (GET, POST, PUT, DELETE, PATCH)
pub struct HttpRequestTool {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl HttpRequestTool {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            timeout,
            user_agent: user_agent.into(),
        })
    }

    async fn run(&self, params: &Value, cancel: &CancellationToken) -> std::result::Result<Outcome, Outcome> {
        let url = parse_url(args::required_str(params, "url", None)?)?;
        let method = parse_method(args::optional_str(params, "method").unwrap_or("GET"))?;
        let timeout = args::optional_secs(params, "timeout")?.unwrap_or(self.timeout);

        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        merge_headers(&mut headers, params.get("headers"))?;

        let mut request = self.client.request(method.clone(), url.clone());
        match encode_body(params.get("body")) {
            Some((body, is_json)) if sends_body(&method) => {
                if is_json && !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                request = request.body(body);
            }
            Some(_) => debug!("Ignoring request body for {}", method),
            None => {}
        }
        let request = request.headers(headers);

        debug!("http_request {} {} (timeout {:?})", method, url, timeout);
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let headers = headers_to_json(response.headers());
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };

        let (status, headers, body) = bounded(exchange, timeout, cancel, Subject::Request)
            .await?
            .map_err(|e| Outcome::transport("HTTP request failed", e))?;

        let formatted = format_body(&body);
        let label = if formatted.is_json { "Response (JSON):" } else { "Response (Text):" };
        let text = [
            format!("Status: {}", status),
            format!("Headers: {}", headers),
            String::new(),
            label.to_string(),
            formatted.text,
        ]
        .join("\n");

        Ok(Outcome::http(text, status))
    }
}

fn parse_url(raw: &str) -> std::result::Result<url::Url, Outcome> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| Outcome::invalid("url", format!("Invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Outcome::invalid(
            "url",
            format!("Unsupported URL scheme '{}', use http or https", other),
        )),
    }
}

fn parse_method(raw: &str) -> std::result::Result<Method, Outcome> {
    match raw.trim().to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(Outcome::invalid(
            "method",
            format!("Unsupported HTTP method: {}", raw),
        )),
    }
}

fn sends_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Caller headers override the defaults; non-string values are skipped
fn merge_headers(headers: &mut HeaderMap, extra: Option<&Value>) -> std::result::Result<(), Outcome> {
    let map = match extra {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(Outcome::invalid("headers", "'headers' must be an object")),
    };

    for (key, value) in map {
        let Some(value) = value.as_str() else { continue };
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| Outcome::invalid("headers", format!("Invalid header name: {}", key)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Outcome::invalid("headers", format!("Invalid value for header {}", key)))?;
        headers.insert(name, value);
    }
    Ok(())
}

/// Strings go out as-is; any other JSON value is serialized
fn encode_body(body: Option<&Value>) -> Option<(String, bool)> {
    match body? {
        Value::Null => None,
        Value::String(s) => Some((s.clone(), false)),
        other => Some((other.to_string(), true)),
    }
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(map)
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str { "http_request" }

    fn description(&self) -> &str {
        "Make HTTP requests to web services. Supports GET, POST, PUT, DELETE, PATCH methods.\n\
         Useful for calling REST APIs, webhooks, or external services.\n\n\
         Parameters:\n\
         - url: The full URL to request\n\
         - method: HTTP method (GET, POST, PUT, DELETE, PATCH). Default: GET\n\
         - headers: Optional object of HTTP headers (e.g., {\"Content-Type\": \"application/json\"})\n\
         - body: Optional request body (for POST, PUT, PATCH). Can be string or JSON object\n\
         - timeout: Optional timeout in seconds. Default: 30"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The full URL to request (e.g., 'https://api.example.com/endpoint')"
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method: GET, POST, PUT, DELETE, PATCH",
                    "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"],
                    "default": "GET"
                },
                "headers": {
                    "type": "object",
                    "description": "Optional HTTP headers as key-value pairs"
                },
                "body": {
                    "type": ["string", "object", "array"],
                    "description": "Optional request body for POST/PUT/PATCH requests"
                },
                "timeout": {
                    "type": "number",
                    "description": "Request timeout in seconds",
                    "default": self.timeout.as_secs()
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value, cancel: &CancellationToken) -> Outcome {
        self.run(&params, cancel).await.unwrap_or_else(|outcome| outcome)
    }
}
