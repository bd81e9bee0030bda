//! Error types for clawbridge
//!
//! These cover construction, configuration and registry failures. Failures
//! of a single tool invocation are reported through [`crate::tools::Outcome`]
//! and never surface here.

use thiserror::Error;

/// Result type alias for clawbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside of a tool invocation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
