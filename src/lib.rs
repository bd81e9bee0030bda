//! clawbridge - external-action tools for conversational agents
//!
//! Every tool exposes a name, a description and a JSON parameter schema,
//! and performs exactly one bounded external action per call: a shell
//! command, an HTTP request, an n8n workflow operation or a message to a
//! sibling Agent Zero instance.

pub mod config;
pub mod error;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
