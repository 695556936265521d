//! State machine for the events streamed by a hosted run.
//!
//! The relay never performs I/O. Each event moves it to a new state and yields
//! effects (text to render, tool calls to answer) that the driver in
//! `run_turn` carries out, so event sequences can be replayed in tests without
//! a live connection.

use crate::ToolCallRequest;

/// An event from a hosted run's stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEvent {
    /// The assistant started writing a new message.
    MessageCreated,
    /// A fragment of assistant text.
    TextDelta(String),
    /// The run is paused until outputs for all of these calls are submitted.
    RequiresAction {
        thread_id: String,
        run_id: String,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// The run finished normally.
    RunCompleted,
    /// The run ended without completing (failed, cancelled, expired).
    RunFailed(String),
    /// Any other lifecycle event. Ignored.
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    AwaitingToolOutputs,
    Done,
    Failed,
}

impl RelayState {
    /// `Done` and `Failed` absorb every further event.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Work the driver must do in response to an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEffect {
    /// Show the whole text accumulated so far, escaped for a markdown surface.
    Render(String),
    /// Execute these calls and submit all outputs to the paused run in one batch.
    SubmitToolOutputs {
        thread_id: String,
        run_id: String,
        tool_calls: Vec<ToolCallRequest>,
    },
}

/// Accumulates the answer text of one turn across every tool round.
#[derive(Debug)]
pub struct Relay {
    state: RelayState,
    buffer: String,
    tool_rounds: u32,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self {
            state: RelayState::Idle,
            buffer: String::new(),
            tool_rounds: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Answer text accumulated so far, unescaped.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn into_text(self) -> String {
        self.buffer
    }

    /// Number of completed tool-output submissions.
    pub fn tool_rounds(&self) -> u32 {
        self.tool_rounds
    }

    /// Feed one event, returning the effects it requires.
    pub fn handle(&mut self, event: RunEvent) -> Vec<RelayEffect> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match event {
            RunEvent::TextDelta(fragment) => {
                self.state = RelayState::Streaming;
                self.buffer.push_str(&fragment);
                vec![RelayEffect::Render(escape_markdown(&self.buffer))]
            }
            RunEvent::RequiresAction {
                thread_id,
                run_id,
                tool_calls,
            } => {
                self.state = RelayState::AwaitingToolOutputs;
                vec![RelayEffect::SubmitToolOutputs {
                    thread_id,
                    run_id,
                    tool_calls,
                }]
            }
            RunEvent::RunCompleted => {
                self.state = RelayState::Done;
                Vec::new()
            }
            RunEvent::RunFailed(_) => {
                self.state = RelayState::Failed;
                Vec::new()
            }
            RunEvent::MessageCreated | RunEvent::Other => {
                if self.state == RelayState::Idle {
                    self.state = RelayState::Streaming;
                }
                Vec::new()
            }
        }
    }

    /// Tool outputs were accepted and the run resumed streaming.
    pub fn resume(&mut self) {
        if self.state == RelayState::AwaitingToolOutputs {
            self.tool_rounds += 1;
            self.state = RelayState::Streaming;
        }
    }

    /// The event stream ended. Completes the turn unless tool outputs are still owed.
    pub fn finish(&mut self) {
        if matches!(self.state, RelayState::Idle | RelayState::Streaming) {
            self.state = RelayState::Done;
        }
    }

    /// A transport error ended the turn.
    pub fn fail(&mut self) {
        self.state = RelayState::Failed;
    }
}

/// Escape `$` so a markdown surface does not read it as a math delimiter.
///
/// Escaping is applied per character, so the escaped form of a prefix is
/// always a prefix of the escaped whole.
pub fn escape_markdown(text: &str) -> String {
    text.replace('$', "\\$")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> RunEvent {
        RunEvent::TextDelta(text.into())
    }

    #[test]
    fn test_text_deltas_render_whole_buffer() {
        let mut relay = Relay::new();
        assert_eq!(relay.state(), RelayState::Idle);

        assert_eq!(relay.handle(delta("Hello")), [RelayEffect::Render("Hello".into())]);
        assert_eq!(
            relay.handle(delta(" world")),
            [RelayEffect::Render("Hello world".into())]
        );
        assert_eq!(relay.state(), RelayState::Streaming);

        relay.finish();
        assert_eq!(relay.state(), RelayState::Done);
        assert_eq!(relay.text(), "Hello world");
    }

    #[test]
    fn test_render_escapes_dollar() {
        let mut relay = Relay::new();
        let effects = relay.handle(delta("costs $5"));
        assert_eq!(effects, [RelayEffect::Render("costs \\$5".into())]);
        assert_eq!(relay.text(), "costs $5");
    }

    #[test]
    fn test_requires_action_waits_for_outputs() {
        let mut relay = Relay::new();
        relay.handle(delta("Hi"));

        let calls = vec![ToolCallRequest {
            call_id: "call_1".into(),
            name: "search_web".into(),
            arguments: r#"{"query":"x"}"#.into(),
        }];
        let effects = relay.handle(RunEvent::RequiresAction {
            thread_id: "thread_1".into(),
            run_id: "run_1".into(),
            tool_calls: calls.clone(),
        });
        assert_eq!(
            effects,
            [RelayEffect::SubmitToolOutputs {
                thread_id: "thread_1".into(),
                run_id: "run_1".into(),
                tool_calls: calls,
            }]
        );
        assert_eq!(relay.state(), RelayState::AwaitingToolOutputs);

        // The paused run's stream closing does not complete the turn
        relay.finish();
        assert_eq!(relay.state(), RelayState::AwaitingToolOutputs);

        relay.resume();
        assert_eq!(relay.state(), RelayState::Streaming);
        assert_eq!(relay.tool_rounds(), 1);

        relay.handle(delta("!"));
        assert_eq!(relay.text(), "Hi!");
    }

    #[test]
    fn test_terminal_states_absorb_events() {
        let mut relay = Relay::new();
        relay.handle(RunEvent::RunFailed("server_error".into()));
        assert_eq!(relay.state(), RelayState::Failed);
        assert!(relay.handle(delta("late")).is_empty());
        relay.finish();
        assert_eq!(relay.state(), RelayState::Failed);
        assert_eq!(relay.text(), "");

        let mut relay = Relay::new();
        relay.handle(delta("done"));
        relay.handle(RunEvent::RunCompleted);
        assert!(relay.handle(delta(" more")).is_empty());
        assert_eq!(relay.into_text(), "done");
    }
}
