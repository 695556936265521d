//! Name-keyed tool registry, and dispatch of tool calls requested by a run.

use crate::{Tool, ToolError, ToolExecutor, ToolResult};
use serde_json::Value;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tracing::{info, warn};

/// A tool call requested by the hosted run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Identifier correlating this request with its submitted result.
    pub call_id: String,
    /// Name of the requested tool.
    pub name: String,
    /// Raw JSON text of the arguments, as sent by the service.
    pub arguments: String,
}

/// Output for exactly one `ToolCallRequest`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallResult {
    pub call_id: String,
    /// Tool output, or a description of why the call failed.
    pub output: String,
    pub is_error: bool,
    pub attachments: Vec<PathBuf>,
}

impl ToolCallResult {
    fn success(call_id: String, result: ToolResult) -> Self {
        Self {
            call_id,
            output: result.text,
            is_error: false,
            attachments: result.attachments,
        }
    }

    fn failure(call_id: String, err: &ToolError) -> Self {
        Self {
            call_id,
            output: format!("Error: {err}"),
            is_error: true,
            attachments: Vec::new(),
        }
    }
}

/// Configuration errors found while registering tools.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two tools share a name.
    #[error("tool {0} is registered more than once")]
    DuplicateTool(&'static str),
    /// The executor advertises a tool it does not handle.
    #[error("tool {0} is advertised but not handled by its executor")]
    Unhandled(&'static str),
    /// The parameter schema is not a usable JSON object schema.
    #[error("tool {tool} has an invalid parameter schema: {reason}")]
    InvalidSchema { tool: &'static str, reason: String },
}

/// Fixed set of tools, each mapped to the executor that runs it.
///
/// Descriptors and executors are checked for consistency when registered, so a
/// name that reaches `dispatch` either resolves or is genuinely unknown.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    executors: HashMap<&'static str, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every tool advertised by `executor`.
    ///
    /// Nothing is registered if any of its tools fails validation.
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) -> Result<(), RegistryError> {
        let tools = executor.tools();
        for (idx, tool) in tools.iter().enumerate() {
            if self.executors.contains_key(tool.name)
                || tools[..idx].iter().any(|t| t.name == tool.name)
            {
                return Err(RegistryError::DuplicateTool(tool.name));
            }
            if !executor.has_tool(tool.name) {
                return Err(RegistryError::Unhandled(tool.name));
            }
            validate_schema(tool)?;
        }

        for tool in tools {
            info!("Registered tool: {}", tool.name);
            self.executors.insert(tool.name, executor.clone());
            self.tools.push(tool);
        }
        Ok(())
    }

    /// Descriptors of all registered tools, in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run one tool call. Always produces a result for the call id; failures
    /// are logged and reported in the output text.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolCallResult {
        info!("Tool call {}: {}({})", call.call_id, call.name, call.arguments);
        match self.try_dispatch(call).await {
            Ok(result) => {
                info!("Tool {} returned {} chars", call.name, result.text.len());
                ToolCallResult::success(call.call_id.clone(), result)
            }
            Err(err) => {
                warn!("Tool {} failed: {}", call.name, err);
                ToolCallResult::failure(call.call_id.clone(), &err)
            }
        }
    }

    /// Run a batch of tool calls sequentially, in the order received.
    pub async fn dispatch_batch(&self, calls: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(call).await);
        }
        results
    }

    async fn try_dispatch(&self, call: &ToolCallRequest) -> Result<ToolResult, ToolError> {
        let executor = self
            .executors
            .get(call.name.as_str())
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let input: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments).map_err(|source| ToolError::ArgumentParse {
                tool: call.name.clone(),
                source,
            })?
        };

        executor.execute(&call.name, &input).await
    }
}

fn validate_schema(tool: &Tool) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidSchema {
        tool: tool.name,
        reason: reason.to_owned(),
    };

    if tool.parameters.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid("type must be \"object\""));
    }
    let properties = match tool.parameters.get("properties") {
        None => None,
        Some(Value::Object(props)) => Some(props),
        Some(_) => return Err(invalid("properties must be an object")),
    };
    let Some(required) = tool.parameters.get("required") else {
        return Ok(());
    };
    let Some(required) = required.as_array() else {
        return Err(invalid("required must be an array"));
    };
    for name in required {
        let Some(name) = name.as_str() else {
            return Err(invalid("required entries must be strings"));
        };
        if !properties.is_some_and(|props| props.contains_key(name)) {
            return Err(invalid(&format!("required parameter {name} is not a property")));
        }
    }
    Ok(())
}
