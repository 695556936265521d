//! Conversation session: which remote assistant and thread this user is talking to.

use crate::{AssistantBackend, BackendError, Tool};
use tokio::sync::OnceCell;
use tracing::info;

/// How to find or create the remote assistant.
#[derive(Clone, Debug)]
pub struct AssistantProfile {
    /// Well-known name looked up in the assistant listing.
    pub name: String,
    /// Instructions given to a newly created assistant.
    pub instructions: String,
    /// Model for a newly created assistant.
    pub model: String,
}

/// Identities of the remote assistant and thread in use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSession {
    pub assistant_id: String,
    pub thread_id: String,
}

/// Holds the conversation session for the lifetime of a user session.
///
/// The session is created on first use and never changes afterwards. A failed
/// bootstrap leaves the context empty, so the next call tries again.
#[derive(Debug, Default)]
pub struct SessionContext {
    session: OnceCell<ConversationSession>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session, if it has been created.
    pub fn get(&self) -> Option<&ConversationSession> {
        self.session.get()
    }

    /// Return the session, creating it on first use.
    pub async fn get_or_bootstrap<B: AssistantBackend + ?Sized>(
        &self,
        backend: &B,
        profile: &AssistantProfile,
        tools: &[Tool],
    ) -> Result<&ConversationSession, BackendError> {
        self.session
            .get_or_try_init(|| bootstrap(backend, profile, tools))
            .await
    }
}

async fn bootstrap<B: AssistantBackend + ?Sized>(
    backend: &B,
    profile: &AssistantProfile,
    tools: &[Tool],
) -> Result<ConversationSession, BackendError> {
    let assistant_id = match find_assistant(backend, &profile.name).await? {
        Some(id) => {
            info!("Reusing assistant {:?} ({})", profile.name, id);
            id
        }
        None => {
            let id = backend.create_assistant(profile, tools).await?;
            info!("Created assistant {:?} ({})", profile.name, id);
            id
        }
    };

    let thread_id = backend.create_thread().await?;
    info!("Created thread {}", thread_id);

    Ok(ConversationSession {
        assistant_id,
        thread_id,
    })
}

/// Walk the whole listing and return the first assistant with this name.
async fn find_assistant<B: AssistantBackend + ?Sized>(
    backend: &B,
    name: &str,
) -> Result<Option<String>, BackendError> {
    let mut cursor: Option<String> = None;
    loop {
        let page = backend.list_assistants(cursor.as_deref()).await?;
        if let Some(found) = page
            .assistants
            .into_iter()
            .find(|a| a.name.as_deref() == Some(name))
        {
            return Ok(Some(found.id));
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(None),
        }
    }
}
