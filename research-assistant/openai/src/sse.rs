//! Server-sent events decoding for streamed runs.

use crate::{
    OpenAiError,
    api::{ApiErrorDetail, ErrorResponse, MessageDeltaObject, RunObject},
};
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt, stream};
use research_assistant::{BackendError, RunEvent, RunEventStream};
use tracing::{debug, warn};

/// Map an event name and its data to a run event. `Ok(None)` marks the end of the stream.
pub(crate) fn decode_frame(event: &str, data: &str) -> Result<Option<RunEvent>, OpenAiError> {
    let decode_err = |source: serde_json::Error| OpenAiError::Decode {
        event: event.into(),
        source,
    };

    let event = match event {
        "done" => return Ok(None),
        "error" => return Err(OpenAiError::Stream(stream_error_message(data))),
        "thread.message.created" => RunEvent::MessageCreated,
        "thread.message.delta" => {
            let delta: MessageDeltaObject = serde_json::from_str(data).map_err(decode_err)?;
            RunEvent::TextDelta(delta.text())
        }
        "thread.run.requires_action" => {
            let run: RunObject = serde_json::from_str(data).map_err(decode_err)?;
            RunEvent::RequiresAction {
                tool_calls: run.tool_calls(),
                thread_id: run.thread_id,
                run_id: run.id,
            }
        }
        "thread.run.completed" => RunEvent::RunCompleted,
        // The answer streamed so far is kept, e.g. when the token limit was hit
        "thread.run.incomplete" => {
            let run: RunObject = serde_json::from_str(data).map_err(decode_err)?;
            warn!("Run {} ended incomplete: {}", run.id, run.failure_reason());
            RunEvent::RunCompleted
        }
        "thread.run.failed" | "thread.run.cancelled" | "thread.run.expired" => {
            let run: RunObject = serde_json::from_str(data).map_err(decode_err)?;
            RunEvent::RunFailed(run.failure_reason())
        }
        _ => RunEvent::Other,
    };
    Ok(Some(event))
}

fn stream_error_message(data: &str) -> Box<str> {
    if let Ok(response) = serde_json::from_str::<ErrorResponse>(data) {
        return response.error.message;
    }
    if let Ok(detail) = serde_json::from_str::<ApiErrorDetail>(data) {
        return detail.message;
    }
    data.into()
}

/// Turn a response body into run events. Ends at `done`, at the end of the body, or after the first error.
pub(crate) fn run_events<S, B>(bytes: S) -> RunEventStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());

    stream::unfold(Some(events), |events| async move {
        let mut events = events?;
        let err = match events.next().await? {
            Ok(event) => {
                debug!("Run event: {}", event.event);
                match decode_frame(&event.event, &event.data) {
                    Ok(Some(run_event)) => return Some((Ok(run_event), Some(events))),
                    Ok(None) => return None,
                    Err(err) => err,
                }
            }
            Err(EventStreamError::Transport(err)) => OpenAiError::Request(err),
            Err(err) => OpenAiError::Stream(err.to_string().into()),
        };
        Some((Err(BackendError::from(err)), None))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_delta() {
        let data = r#"{"id":"msg_1","object":"thread.message.delta","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hello"}}]}}"#;
        let event = decode_frame("thread.message.delta", data).unwrap();
        assert_eq!(event, Some(RunEvent::TextDelta("Hello".to_owned())));
    }

    #[test]
    fn test_decode_requires_action() {
        let data = r#"{
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "search_web", "arguments": "{\"query\":\"rust\"}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "save_text", "arguments": "{}"}}
                    ]
                }
            },
            "last_error": null
        }"#;
        let Some(RunEvent::RequiresAction {
            thread_id,
            run_id,
            tool_calls,
        }) = decode_frame("thread.run.requires_action", data).unwrap()
        else {
            panic!("expected requires_action");
        };
        assert_eq!(thread_id, "thread_1");
        assert_eq!(run_id, "run_1");
        let ids: Vec<_> = tool_calls.iter().map(|c| c.call_id.as_str()).collect();
        assert_eq!(ids, ["call_1", "call_2"]);
        assert_eq!(tool_calls[0].name, "search_web");
        assert_eq!(tool_calls[0].arguments, r#"{"query":"rust"}"#);
    }

    #[test]
    fn test_decode_failed_run() {
        let data = r#"{"id":"run_1","thread_id":"thread_1","status":"failed","required_action":null,"last_error":{"code":"rate_limit_exceeded","message":"slow down"}}"#;
        let event = decode_frame("thread.run.failed", data).unwrap();
        assert_eq!(
            event,
            Some(RunEvent::RunFailed(
                "failed (rate_limit_exceeded): slow down".to_owned()
            ))
        );
    }

    #[test]
    fn test_decode_incomplete_run_keeps_answer() {
        let data = r#"{"id":"run_1","thread_id":"thread_1","status":"incomplete","required_action":null,"last_error":null}"#;
        let event = decode_frame("thread.run.incomplete", data).unwrap();
        assert_eq!(event, Some(RunEvent::RunCompleted));
    }

    #[test]
    fn test_decode_done_and_unknown() {
        assert_eq!(decode_frame("done", "[DONE]").unwrap(), None);
        assert_eq!(
            decode_frame("thread.run.step.created", "{}").unwrap(),
            Some(RunEvent::Other)
        );
    }

    #[test]
    fn test_decode_error_event() {
        let err = decode_frame("error", r#"{"message":"server exploded"}"#).unwrap_err();
        assert!(matches!(err, OpenAiError::Stream(msg) if &*msg == "server exploded"));
    }

    #[test]
    fn test_decode_malformed_delta() {
        let err = decode_frame("thread.message.delta", "not json").unwrap_err();
        assert!(matches!(err, OpenAiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_run_events_stops_at_done() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(b"event: thread.message.created\ndata: {}\n\nevent: thread.mes".to_vec()),
            Ok(b"sage.delta\ndata: {\"delta\":{\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"Hi\"}}]}}\n\n".to_vec()),
            Ok(b"event: done\ndata: [DONE]\n\nevent: thread.run.completed\ndata: {}\n\n".to_vec()),
        ];
        let events: Vec<_> = run_events(stream::iter(chunks)).collect().await;
        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![RunEvent::MessageCreated, RunEvent::TextDelta("Hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_run_events_across_crlf_chunks() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(b": keepalive\r\n\r\nevent: thread.run.com".to_vec()),
            Ok(b"pleted\r\ndata: {".to_vec()),
            Ok(b"}\r\n\r\n".to_vec()),
        ];
        let events: Vec<_> = run_events(stream::iter(chunks)).collect().await;
        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events, vec![RunEvent::RunCompleted]);
    }

    #[tokio::test]
    async fn test_run_events_ends_after_error_event() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![Ok(
            b"event: error\ndata: {\"message\":\"overloaded\"}\n\nevent: thread.run.completed\ndata: {}\n\n"
                .to_vec(),
        )];
        let events: Vec<_> = run_events(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 1);
        let err = events.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "stream error: overloaded");
    }
}
