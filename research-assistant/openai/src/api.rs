//! OpenAI Assistants API (v2) types.

use research_assistant::{Tool, ToolCallRequest, ToolCallResult};
use serde::{Deserialize, Serialize};

/// A paginated list response.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    pub last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssistantObject {
    pub id: String,
    pub name: Option<String>,
}

/// Request body for creating an assistant.
#[derive(Serialize)]
pub(crate) struct CreateAssistantRequest<'a> {
    pub name: &'a str,
    pub instructions: &'a str,
    pub model: &'a str,
    pub tools: Vec<FunctionTool<'a>>,
}

/// A function tool definition, wrapping a registry descriptor.
#[derive(Serialize)]
pub(crate) struct FunctionTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a Tool,
}

impl<'a> From<&'a Tool> for FunctionTool<'a> {
    fn from(tool: &'a Tool) -> Self {
        Self {
            tool_type: "function",
            function: tool,
        }
    }
}

/// Any object where only the id matters (threads, messages, cancelled runs).
#[derive(Debug, Deserialize)]
pub(crate) struct IdObject {
    pub id: String,
}

#[derive(Serialize)]
pub(crate) struct CreateMessageRequest<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageObject {
    pub role: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl MessageObject {
    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A content part of a message. Only text is rendered.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextContent {
    pub value: String,
}

#[derive(Serialize)]
pub(crate) struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
    pub stream: bool,
}

#[derive(Serialize)]
pub(crate) struct SubmitToolOutputsRequest<'a> {
    pub tool_outputs: Vec<ToolOutput<'a>>,
    pub stream: bool,
}

#[derive(Serialize)]
pub(crate) struct ToolOutput<'a> {
    pub tool_call_id: &'a str,
    pub output: &'a str,
}

impl<'a> From<&'a ToolCallResult> for ToolOutput<'a> {
    fn from(result: &'a ToolCallResult) -> Self {
        Self {
            tool_call_id: &result.call_id,
            output: &result.output,
        }
    }
}

/// Payload of `thread.message.delta` events.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageDeltaObject {
    pub delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDelta {
    #[serde(default)]
    pub content: Vec<MessageDeltaContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum MessageDeltaContent {
    Text { text: TextDelta },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDelta {
    #[serde(default)]
    pub value: String,
}

impl MessageDeltaObject {
    pub fn text(&self) -> String {
        self.delta
            .content
            .iter()
            .filter_map(|part| match part {
                MessageDeltaContent::Text { text } => Some(text.value.as_str()),
                MessageDeltaContent::Other => None,
            })
            .collect()
    }
}

/// Payload of `thread.run.*` events.
#[derive(Debug, Deserialize)]
pub(crate) struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: String,
    pub required_action: Option<RequiredAction>,
    pub last_error: Option<RunError>,
}

impl RunObject {
    /// Tool calls the run is waiting on, in the order the service listed them.
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.required_action
            .iter()
            .flat_map(|action| &action.submit_tool_outputs.tool_calls)
            .map(|call| ToolCallRequest {
                call_id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect()
    }

    /// Why the run stopped, for runs that did not complete.
    pub fn failure_reason(&self) -> String {
        match &self.last_error {
            Some(err) => format!("{} ({}): {}", self.status, err.code, err.message),
            None => self.status.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputsAction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitToolOutputsAction {
    pub tool_calls: Vec<ToolCallObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallObject {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Error response from the OpenAI API, also sent as the payload of `error` stream events.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: Box<str>,
}
