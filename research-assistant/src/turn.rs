//! Driver that applies relay effects against a backend for one user turn.

use crate::{
    AssistantBackend, AssistantResponse, BackendError, Relay, RelayEffect, RelayState, RunEvent,
    RunEventStream, ToolRegistry,
};
use futures_util::StreamExt;
use tracing::{error, info, warn};

/// Surface that shows the answer while it streams in.
///
/// `render` receives the whole escaped text accumulated so far, each time it grows.
pub trait Renderer: Send {
    fn render(&mut self, text: &str);
}

impl<F: FnMut(&str) + Send> Renderer for F {
    fn render(&mut self, text: &str) {
        self(text)
    }
}

/// Errors that end a turn. The conversation session stays usable.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The backend or its event stream failed.
    #[error("assistant service error: {0}")]
    Backend(#[source] BackendError),
    /// The hosted run ended without completing.
    #[error("run did not complete: {0}")]
    RunFailed(String),
    /// The run kept requesting tools past the configured bound.
    #[error("exceeded maximum tool rounds ({0})")]
    TooManyToolRounds(u32),
}

/// Consume a run's events until it completes, answering every tool round.
///
/// After each batch of outputs is submitted, the stream returned by the
/// backend replaces the current one and the same relay keeps accumulating
/// text. At most `max_tool_rounds` batches are answered; when the run asks
/// for more, it is cancelled and the turn fails.
pub async fn run_turn<B: AssistantBackend + ?Sized>(
    backend: &B,
    registry: &ToolRegistry,
    renderer: &mut dyn Renderer,
    mut events: RunEventStream,
    max_tool_rounds: u32,
) -> Result<AssistantResponse, TurnError> {
    let mut relay = Relay::new();
    let mut attachments = Vec::new();

    while let Some(event) = events.next().await {
        let event = event.map_err(|err| {
            relay.fail();
            error!("Run stream failed: {}", err);
            TurnError::Backend(err)
        })?;

        let failure = match &event {
            RunEvent::RunFailed(reason) => Some(reason.clone()),
            _ => None,
        };

        for effect in relay.handle(event) {
            match effect {
                RelayEffect::Render(text) => renderer.render(&text),
                RelayEffect::SubmitToolOutputs {
                    thread_id,
                    run_id,
                    tool_calls,
                } => {
                    if relay.tool_rounds() >= max_tool_rounds {
                        relay.fail();
                        warn!("Run {} exceeded {} tool rounds, cancelling", run_id, max_tool_rounds);
                        if let Err(err) = backend.cancel_run(&thread_id, &run_id).await {
                            warn!("Failed to cancel run {}: {}", run_id, err);
                        }
                        return Err(TurnError::TooManyToolRounds(max_tool_rounds));
                    }

                    info!("Run {} requested {} tool calls", run_id, tool_calls.len());
                    let outputs = registry.dispatch_batch(&tool_calls).await;
                    attachments.extend(outputs.iter().flat_map(|o| o.attachments.iter().cloned()));

                    events = backend
                        .submit_tool_outputs(&thread_id, &run_id, &outputs)
                        .await
                        .map_err(|err| {
                            relay.fail();
                            error!("Submitting tool outputs for run {} failed: {}", run_id, err);
                            TurnError::Backend(err)
                        })?;
                    relay.resume();
                    info!("Tool round {} submitted", relay.tool_rounds());
                }
            }
        }

        if let Some(reason) = failure {
            error!("Run failed: {}", reason);
            return Err(TurnError::RunFailed(reason));
        }
    }

    relay.finish();
    debug_assert_eq!(relay.state(), RelayState::Done);

    let tool_rounds = relay.tool_rounds();
    let text = relay.into_text();
    info!("Run complete after {} tool rounds: {} chars", tool_rounds, text.len());
    Ok(AssistantResponse::new(text)
        .with_attachments(attachments)
        .with_tool_rounds(tool_rounds))
}
