//! OpenAI Assistants API implementation of the assistant backend.

mod api;
mod client;
mod sse;

pub use client::OpenAiClient;

use conf::Conf;
use std::path::PathBuf;

/// Configuration for the OpenAI Assistants API integration.
#[derive(Clone, Conf, Debug)]
#[conf(serde)]
pub struct OpenAiConfig {
    /// Path to file containing the OpenAI API key.
    #[conf(long, env)]
    pub api_key_file: PathBuf,
    /// OpenAI API base URL.
    #[conf(long, env, default_value = "https://api.openai.com/v1")]
    pub openai_api_url: String,
    /// Model used when the assistant has to be created.
    #[conf(long, env, default_value = "gpt-4o-mini")]
    pub openai_model: String,
    /// Name of the hosted assistant to reuse or create.
    #[conf(long, env, default_value = "Research Assistant")]
    pub assistant_name: String,
    /// Path to a file with the assistant's instructions. A built-in research prompt is used if omitted.
    #[conf(long, env)]
    pub instructions_file: Option<PathBuf>,
    /// Maximum tool rounds answered in one turn before the run is cancelled.
    #[conf(long, env, default_value = "10")]
    pub max_tool_rounds: u32,
}

/// Error type for OpenAI API operations.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// Failed to read API key file.
    #[error("failed to read API key file: {0}")]
    ApiKeyRead(std::io::Error),
    /// The API rejected the key.
    #[error("authentication failed: {0}")]
    Authentication(Box<str>),
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {0}")]
    ApiError(Box<str>),
    /// The run stream reported an error.
    #[error("stream error: {0}")]
    Stream(Box<str>),
    /// A stream event could not be parsed.
    #[error("malformed {event} event: {source}")]
    Decode {
        event: Box<str>,
        source: serde_json::Error,
    },
}
