use crate::{
    AssistantBackend, AssistantProfile, AssistantResponse, ChatMessage, ConversationSession,
    Renderer, SessionContext, ToolRegistry, run_turn,
};
use std::error::Error;
use tracing::info;

/// Assistant trait which handles research prompts.
///
/// Implementations handle the hosted service calls, conversation state, and
/// tool execution. Turns are serialized by `&mut self`.
#[async_trait::async_trait]
pub trait Assistant: Send {
    /// The visible conversation so far, oldest first.
    async fn history(&mut self) -> Result<Vec<ChatMessage>, Box<dyn Error + Send + Sync>>;

    /// Process a user message, rendering the answer as it streams in.
    ///
    /// An error ends this turn only; the assistant accepts further prompts.
    async fn prompt(
        &mut self,
        message: ChatMessage,
        renderer: &mut dyn Renderer,
    ) -> Result<AssistantResponse, Box<dyn Error + Send + Sync>>;

    /// Log the assistant's current state for debugging.
    fn debug_log(&mut self);
}

/// Assistant backed by a hosted service, answering its tool calls from a local registry.
pub struct HostedAssistant<B> {
    backend: B,
    registry: ToolRegistry,
    profile: AssistantProfile,
    max_tool_rounds: u32,
    session: SessionContext,
}

impl<B: AssistantBackend> HostedAssistant<B> {
    pub fn new(
        backend: B,
        registry: ToolRegistry,
        profile: AssistantProfile,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            backend,
            registry,
            profile,
            max_tool_rounds,
            session: SessionContext::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The conversation session, bootstrapped on first use.
    pub async fn session(
        &self,
    ) -> Result<&ConversationSession, Box<dyn Error + Send + Sync>> {
        self.session
            .get_or_bootstrap(&self.backend, &self.profile, self.registry.tools())
            .await
    }
}

#[async_trait::async_trait]
impl<B: AssistantBackend> Assistant for HostedAssistant<B> {
    async fn history(&mut self) -> Result<Vec<ChatMessage>, Box<dyn Error + Send + Sync>> {
        let thread_id = self.session().await?.thread_id.clone();
        self.backend.list_messages(&thread_id).await
    }

    async fn prompt(
        &mut self,
        message: ChatMessage,
        renderer: &mut dyn Renderer,
    ) -> Result<AssistantResponse, Box<dyn Error + Send + Sync>> {
        let session = self.session().await?.clone();

        info!("Research request: {}", message.text);
        self.backend
            .add_user_message(&session.thread_id, &message.text)
            .await?;

        let events = self
            .backend
            .start_run(&session.thread_id, &session.assistant_id)
            .await?;

        let response = run_turn(
            &self.backend,
            &self.registry,
            renderer,
            events,
            self.max_tool_rounds,
        )
        .await?;
        Ok(response)
    }

    fn debug_log(&mut self) {
        match self.session.get() {
            Some(session) => info!(
                "Assistant {:?}: assistant_id={} thread_id={}",
                self.profile.name, session.assistant_id, session.thread_id
            ),
            None => info!("Assistant {:?}: no session yet", self.profile.name),
        }
        let names: Vec<_> = self.registry.tools().iter().map(|t| t.name).collect();
        info!("Registered tools: {}", names.join(", "));
    }
}
