//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::Result;
use crate::error::Error;

/// Environment variable that overrides `agent_zero.api_key`
pub const AGENT_ZERO_KEY_ENV: &str = "AGENT_ZERO_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory path
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// How long a timed-out process group gets between SIGTERM and SIGKILL
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Local shell tool
    #[serde(default)]
    pub local: LocalConfig,

    /// Agent Zero through `docker exec`
    #[serde(default)]
    pub docker: DockerConfig,

    /// `opencode agent` wrapper
    #[serde(default)]
    pub opencode: OpencodeConfig,

    /// Generic HTTP request tool
    #[serde(default)]
    pub http: HttpConfig,

    /// n8n workflow tool
    #[serde(default)]
    pub n8n: N8nConfig,

    /// Agent Zero HTTP API
    #[serde(default)]
    pub agent_zero: AgentZeroConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_process_timeout")]
    pub timeout_secs: u64,

    /// Working directory; the workspace is used when unset
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_container")]
    pub container: String,

    /// Directory inside the container holding the Agent Zero checkout and its venv
    #[serde(default = "default_agent_zero_dir")]
    pub project_dir: String,

    #[serde(default = "default_process_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpencodeConfig {
    #[serde(default = "default_opencode_dir")]
    pub working_dir: PathBuf,

    #[serde(default = "default_process_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Which HTTP stack the n8n tool talks through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Async,
    Blocking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct N8nConfig {
    /// File holding `{"apiUrl": ..., "apiKey": ...}`
    #[serde(default = "default_n8n_config_path")]
    pub config_path: PathBuf,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub transport: TransportKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentZeroConfig {
    #[serde(default = "default_agent_zero_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_agent_zero_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

/// Credentials file read by the n8n tool
#[derive(Debug, Clone, Deserialize)]
pub struct N8nCredentials {
    #[serde(rename = "apiUrl", default)]
    pub api_url: Option<String>,

    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

fn default_workspace() -> PathBuf {
    config_dir().join("workspace")
}

fn default_kill_grace_ms() -> u64 {
    2000
}

fn default_process_timeout() -> u64 {
    60
}

fn default_container() -> String {
    "agent-zero".to_string()
}

fn default_agent_zero_dir() -> String {
    "/root/.openclaw/workspace/agent-zero".to_string()
}

fn default_opencode_dir() -> PathBuf {
    PathBuf::from(default_agent_zero_dir())
}

fn default_http_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("clawbridge/{}", env!("CARGO_PKG_VERSION"))
}

fn default_n8n_config_path() -> PathBuf {
    config_dir().join("n8n-config.json")
}

fn default_agent_zero_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_agent_zero_timeout() -> u64 {
    120
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_process_timeout(),
            working_dir: None,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            project_dir: default_agent_zero_dir(),
            timeout_secs: default_process_timeout(),
        }
    }
}

impl Default for OpencodeConfig {
    fn default() -> Self {
        Self {
            working_dir: default_opencode_dir(),
            timeout_secs: default_process_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self {
            config_path: default_n8n_config_path(),
            timeout_secs: default_http_timeout(),
            transport: TransportKind::default(),
        }
    }
}

impl Default for AgentZeroConfig {
    fn default() -> Self {
        Self {
            api_url: default_agent_zero_url(),
            api_key: None,
            timeout_secs: default_agent_zero_timeout(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            kill_grace_ms: default_kill_grace_ms(),
            local: LocalConfig::default(),
            docker: DockerConfig::default(),
            opencode: OpencodeConfig::default(),
            http: HttpConfig::default(),
            n8n: N8nConfig::default(),
            agent_zero: AgentZeroConfig::default(),
        }
    }
}

impl Config {
    /// Working directory for the local shell tool
    pub fn local_working_dir(&self) -> PathBuf {
        self.local
            .working_dir
            .clone()
            .unwrap_or_else(|| self.workspace.clone())
    }

    /// Apply environment overrides on top of file values
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(AGENT_ZERO_KEY_ENV) {
            if !key.trim().is_empty() {
                self.agent_zero.api_key = Some(key);
            }
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clawbridge")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default location.
///
/// A missing file is not an error: every tool has usable defaults, so the
/// defaults are returned instead.
pub fn load() -> Result<Config> {
    load_from(&config_path())
}

/// Load configuration from an explicit path
pub fn load_from(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid JSON in {:?}: {}", path, e)))?
    } else {
        tracing::debug!("No config at {:?}, using defaults", path);
        Config::default()
    };
    config.apply_env();
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// Save configuration to an explicit path
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write a default configuration and create the workspace.
///
/// An existing config file is left untouched.
pub fn init() -> Result<Config> {
    init_at(&config_path())
}

/// [`init`] against an explicit config path
pub fn init_at(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        load_from(path)?
    } else {
        let config = Config::default();
        save_to(&config, path)?;
        config
    };
    std::fs::create_dir_all(&config.workspace)?;
    Ok(config)
}

/// Load the n8n credentials file.
///
/// Fails when the file is absent, is not JSON, or lacks a non-empty
/// `apiUrl` or `apiKey`.
pub fn load_n8n_credentials(path: &Path) -> Result<(String, String)> {
    if !path.exists() {
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    let content = std::fs::read_to_string(path)?;
    let creds: N8nCredentials = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid JSON in config file: {}", e)))?;

    match (creds.api_url, creds.api_key) {
        (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
            Ok((url.trim().trim_end_matches('/').to_string(), key))
        }
        _ => Err(Error::Config(
            "Invalid config: apiUrl and apiKey are required".to_string(),
        )),
    }
}
