//! Response type for assistant interactions.

use std::path::PathBuf;

/// Outcome of one research turn.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct AssistantResponse {
    /// Final answer text, unescaped.
    pub text: String,
    /// Files written by tools during the turn, in the order they were produced.
    pub attachments: Vec<PathBuf>,
    /// Number of tool-output rounds the run went through.
    pub tool_rounds: u32,
}

impl AssistantResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_tool_rounds(mut self, tool_rounds: u32) -> Self {
        self.tool_rounds = tool_rounds;
        self
    }
}
