//! Tool definitions and executor trait.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::path::PathBuf;

/// Trait for executing tools. Implement this to provide tool capabilities.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Get the list of available tools as tool descriptors.
    fn tools(&self) -> Vec<Tool>;

    /// Check if this executor handles a tool with the given name.
    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|t| t.name == name)
    }

    /// Execute a tool by name with already-parsed JSON arguments.
    async fn execute(&self, name: &str, input: &Value) -> Result<ToolResult, ToolError>;
}

/// A tool descriptor advertised to the hosted assistant.
#[derive(Clone, Debug, Serialize)]
pub struct Tool {
    /// The name of the tool.
    pub name: &'static str,
    /// A description of what the tool does.
    pub description: &'static str,
    /// JSON schema for the tool's parameters.
    pub parameters: Value,
}

/// Output of a successful tool execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolResult {
    /// Text returned to the hosted run.
    pub text: String,
    /// Files produced by the tool that the user may want to keep.
    pub attachments: Vec<PathBuf>,
}

impl ToolResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, path: PathBuf) -> Self {
        self.attachments.push(path);
        self
    }
}

/// Errors raised while resolving or running a tool.
///
/// These never reach the end user directly: the registry turns them into the
/// output text of the failed call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No registered tool has this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The arguments were not valid JSON, or did not match the tool's parameters.
    #[error("invalid arguments for {tool}: {source}")]
    ArgumentParse {
        tool: String,
        source: serde_json::Error,
    },
    /// The arguments parsed but their values are unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A search backend failed.
    #[error("search failed: {0}")]
    Search(String),
    /// An HTTP request made by a tool failed.
    #[error("request failed: {0}")]
    Transport(String),
    /// Reading or writing a local file failed.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Deserialize a tool's JSON arguments into its typed input.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, input: &Value) -> Result<T, ToolError> {
    serde_json::from_value(input.clone()).map_err(|source| ToolError::ArgumentParse {
        tool: tool.to_owned(),
        source,
    })
}
