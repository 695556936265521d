//! Assistant API used by the research assistant.
//!
//! The hosted service (assistant, threads, runs) is reached through the
//! `AssistantBackend` trait. Everything the local program is responsible for
//! lives here: the tool registry and executor, the conversation session, and
//! the relay that consumes run events and answers tool calls.
//!
//! `HostedAssistant` ties these together and implements `Assistant`, which is
//! what a front end talks to.

mod assistant;
mod backend;
mod chat_message;
mod registry;
mod relay;
mod response;
mod session;
mod tools;
mod turn;

pub use assistant::{Assistant, HostedAssistant};
pub use backend::{AssistantBackend, AssistantPage, AssistantSummary, BackendError, RunEventStream};
pub use chat_message::{ChatMessage, Role};
pub use registry::{RegistryError, ToolCallRequest, ToolCallResult, ToolRegistry};
pub use relay::{Relay, RelayEffect, RelayState, RunEvent, escape_markdown};
pub use response::AssistantResponse;
pub use session::{AssistantProfile, ConversationSession, SessionContext};
pub use tools::{Tool, ToolError, ToolExecutor, ToolResult, parse_arguments};
pub use turn::{Renderer, TurnError, run_turn};
