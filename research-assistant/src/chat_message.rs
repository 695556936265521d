use chrono::{DateTime, Utc};
use std::fmt;

/// Who wrote a message in the conversation thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Returns the role string used by the hosted API.
    pub fn api_role(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parses an API role string. Anything that is not "assistant" is treated as the user.
    pub fn from_api_role(role: &str) -> Self {
        match role {
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_role())
    }
}

/// A chat message, as shown in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub text: Box<str>,
}

impl ChatMessage {
    /// A message typed by the user right now.
    pub fn user(text: impl Into<Box<str>>) -> Self {
        Self {
            role: Role::User,
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}
