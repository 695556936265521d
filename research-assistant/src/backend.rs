use crate::{AssistantProfile, ChatMessage, RunEvent, Tool, ToolCallResult};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::error::Error;

/// Error type returned by backends. Each backend keeps its own error enum and boxes it here.
pub type BackendError = Box<dyn Error + Send + Sync>;

/// Events of one streamed run, or of the continuation returned after submitting tool outputs.
pub type RunEventStream = BoxStream<'static, Result<RunEvent, BackendError>>;

/// One entry of the hosted service's assistant listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantSummary {
    pub id: String,
    pub name: Option<String>,
}

/// A page of the assistant listing.
#[derive(Clone, Debug, Default)]
pub struct AssistantPage {
    pub assistants: Vec<AssistantSummary>,
    /// Cursor for the next page, if the listing has more entries.
    pub next_cursor: Option<String>,
}

/// Hosted assistant service: assistants, threads, messages and streamed runs.
///
/// The service owns the run lifecycle. Implementations only translate these
/// calls to its API.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// List assistants, starting after `cursor` if given.
    async fn list_assistants(&self, cursor: Option<&str>) -> Result<AssistantPage, BackendError>;

    /// Create an assistant advertising `tools`, returning its id.
    async fn create_assistant(
        &self,
        profile: &AssistantProfile,
        tools: &[Tool],
    ) -> Result<String, BackendError>;

    /// Create an empty conversation thread, returning its id.
    async fn create_thread(&self) -> Result<String, BackendError>;

    /// Append a user message to a thread.
    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<(), BackendError>;

    /// All messages of a thread, oldest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, BackendError>;

    /// Start a streamed run of `assistant_id` over the thread.
    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunEventStream, BackendError>;

    /// Submit one output per pending tool call, resuming the run's stream.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunEventStream, BackendError>;

    /// Cancel a run that will not be resumed.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError>;
}
