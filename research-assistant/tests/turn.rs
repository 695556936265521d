//! Tests driving `HostedAssistant` and `run_turn` against a scripted backend.

use async_trait::async_trait;
use futures_util::StreamExt;
use research_assistant::{
    Assistant, AssistantBackend, AssistantPage, AssistantProfile, AssistantSummary, BackendError,
    ChatMessage, HostedAssistant, Role, RunEvent, RunEventStream, SessionContext, Tool, ToolCallRequest,
    ToolCallResult, ToolError, ToolExecutor, ToolRegistry, ToolResult, TurnError, run_turn,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Backend that replays scripted streams and records every call made to it.
#[derive(Default)]
struct ScriptedBackend {
    pages: Vec<AssistantPage>,
    streams: Mutex<VecDeque<Vec<Result<RunEvent, String>>>>,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Vec<ToolCallResult>>>,
}

impl ScriptedBackend {
    fn with_streams(streams: Vec<Vec<Result<RunEvent, String>>>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
            ..Default::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn next_stream(&self) -> RunEventStream {
        let events = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        futures_util::stream::iter(events.into_iter().map(|e| e.map_err(BackendError::from))).boxed()
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn list_assistants(&self, cursor: Option<&str>) -> Result<AssistantPage, BackendError> {
        self.record(format!("list_assistants {cursor:?}"));
        let idx = match cursor {
            None => 0,
            Some(c) => c.parse::<usize>()?,
        };
        Ok(self.pages.get(idx).cloned().unwrap_or_default())
    }

    async fn create_assistant(
        &self,
        profile: &AssistantProfile,
        tools: &[Tool],
    ) -> Result<String, BackendError> {
        self.record(format!("create_assistant {} tools={}", profile.name, tools.len()));
        Ok("asst_new".into())
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        self.record("create_thread".into());
        Ok("thread_1".into())
    }

    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<(), BackendError> {
        self.record(format!("add_user_message {thread_id} {text}"));
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, BackendError> {
        self.record(format!("list_messages {thread_id}"));
        Ok(vec![ChatMessage::user("earlier topic")])
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunEventStream, BackendError> {
        self.record(format!("start_run {thread_id} {assistant_id}"));
        Ok(self.next_stream())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunEventStream, BackendError> {
        self.record(format!("submit_tool_outputs {thread_id} {run_id}"));
        self.submitted.lock().unwrap().push(outputs.to_vec());
        Ok(self.next_stream())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        self.record(format!("cancel_run {thread_id} {run_id}"));
        Ok(())
    }
}

/// A `search_web` tool that logs its invocations into a shared event log.
struct LoggingSearch {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ToolExecutor for LoggingSearch {
    fn tools(&self) -> Vec<Tool> {
        vec![Tool {
            name: "search_web",
            description: "search",
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        }]
    }

    async fn execute(&self, _name: &str, input: &Value) -> Result<ToolResult, ToolError> {
        let query = input["query"].as_str().unwrap_or_default().to_owned();
        self.log.lock().unwrap().push(format!("tool:{query}"));
        if query == "save" {
            return Ok(ToolResult::new("saved").with_attachment(PathBuf::from("research_results_save.txt")));
        }
        Ok(ToolResult::new(format!("results for {query}")))
    }
}

fn registry(log: &Arc<Mutex<Vec<String>>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(LoggingSearch { log: log.clone() }))
        .unwrap();
    registry
}

fn profile() -> AssistantProfile {
    AssistantProfile {
        name: "Research Assistant".into(),
        instructions: "You are a research expert.".into(),
        model: "gpt-4o-mini".into(),
    }
}

fn text(s: &str) -> Result<RunEvent, String> {
    Ok(RunEvent::TextDelta(s.into()))
}

fn requires_search(call_id: &str, query: &str) -> Result<RunEvent, String> {
    Ok(RunEvent::RequiresAction {
        thread_id: "thread_1".into(),
        run_id: "run_1".into(),
        tool_calls: vec![ToolCallRequest {
            call_id: call_id.into(),
            name: "search_web".into(),
            arguments: json!({ "query": query }).to_string(),
        }],
    })
}

#[tokio::test]
async fn test_relay_renders_then_calls_tool_then_finishes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![
        vec![text("Hello"), text(" world"), requires_search("call_1", "x")],
        vec![text(" Done"), Ok(RunEvent::RunCompleted)],
    ]);
    let first = backend.next_stream();

    let render_log = log.clone();
    let mut renderer = move |text: &str| render_log.lock().unwrap().push(format!("render:{text}"));

    let response = run_turn(&backend, &registry(&log), &mut renderer, first, 10)
        .await
        .unwrap();

    assert_eq!(response.text, "Hello world Done");
    assert_eq!(response.tool_rounds, 1);
    assert_eq!(
        *log.lock().unwrap(),
        [
            "render:Hello",
            "render:Hello world",
            "tool:x",
            "render:Hello world Done",
        ]
    );

    let submitted = backend.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].len(), 1);
    assert_eq!(submitted[0][0].call_id, "call_1");
    assert_eq!(submitted[0][0].output, "results for x");
    assert_eq!(backend.count("submit_tool_outputs"), 1);
}

#[tokio::test]
async fn test_attachments_are_collected_across_rounds() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![
        vec![requires_search("call_1", "save")],
        vec![requires_search("call_2", "more")],
        vec![text("All saved.")],
    ]);
    let first = backend.next_stream();
    let mut renderer = |_: &str| {};

    let response = run_turn(&backend, &registry(&log), &mut renderer, first, 10)
        .await
        .unwrap();

    assert_eq!(response.text, "All saved.");
    assert_eq!(response.tool_rounds, 2);
    assert_eq!(response.attachments, [PathBuf::from("research_results_save.txt")]);
}

#[tokio::test]
async fn test_too_many_tool_rounds_cancels_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![
        vec![requires_search("call_1", "a")],
        vec![requires_search("call_2", "b")],
    ]);
    let first = backend.next_stream();
    let mut renderer = |_: &str| {};

    let err = run_turn(&backend, &registry(&log), &mut renderer, first, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::TooManyToolRounds(1)));
    assert_eq!(backend.count("submit_tool_outputs"), 1);
    assert_eq!(backend.count("cancel_run thread_1 run_1"), 1);
}

#[tokio::test]
async fn test_stream_error_fails_turn() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![vec![
        text("partial"),
        Err("connection reset".into()),
    ]]);
    let first = backend.next_stream();
    let mut renderer = |_: &str| {};

    let err = run_turn(&backend, &registry(&log), &mut renderer, first, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Backend(_)));
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_run_failed_event_fails_turn() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![vec![
        text("partial"),
        Ok(RunEvent::RunFailed("rate_limit_exceeded".into())),
    ]]);
    let first = backend.next_stream();
    let mut renderer = |_: &str| {};

    let err = run_turn(&backend, &registry(&log), &mut renderer, first, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::RunFailed(ref reason) if reason == "rate_limit_exceeded"));
}

#[tokio::test]
async fn test_bootstrap_twice_reuses_session() {
    let backend = ScriptedBackend::default();
    let context = SessionContext::new();
    let tools = registry(&Arc::new(Mutex::new(Vec::new())));

    let first = context
        .get_or_bootstrap(&backend, &profile(), tools.tools())
        .await
        .unwrap()
        .clone();
    let second = context
        .get_or_bootstrap(&backend, &profile(), tools.tools())
        .await
        .unwrap()
        .clone();

    assert_eq!(first, second);
    assert_eq!(first.assistant_id, "asst_new");
    assert_eq!(backend.count("create_assistant"), 1);
    assert_eq!(backend.count("create_thread"), 1);
    assert_eq!(backend.count("list_assistants"), 1);
}

#[tokio::test]
async fn test_bootstrap_finds_assistant_on_later_page() {
    let summary = |id: &str, name: Option<&str>| AssistantSummary {
        id: id.into(),
        name: name.map(Into::into),
    };
    let backend = ScriptedBackend {
        pages: vec![
            AssistantPage {
                assistants: vec![summary("asst_a", Some("Other")), summary("asst_b", None)],
                next_cursor: Some("1".into()),
            },
            AssistantPage {
                assistants: vec![
                    summary("asst_c", Some("Research Assistant")),
                    summary("asst_d", Some("Research Assistant")),
                ],
                next_cursor: None,
            },
        ],
        ..Default::default()
    };

    let session = SessionContext::new()
        .get_or_bootstrap(&backend, &profile(), &[])
        .await
        .unwrap()
        .clone();

    assert_eq!(session.assistant_id, "asst_c");
    assert_eq!(backend.count("list_assistants"), 2);
    assert_eq!(backend.count("create_assistant"), 0);
}

#[tokio::test]
async fn test_bootstrap_creates_only_after_listing_exhausted() {
    let backend = ScriptedBackend {
        pages: vec![AssistantPage {
            assistants: vec![
                AssistantSummary { id: "asst_a".into(), name: Some("Other".into()) },
                AssistantSummary { id: "asst_b".into(), name: Some("Another".into()) },
            ],
            next_cursor: None,
        }],
        ..Default::default()
    };

    let tools = registry(&Arc::new(Mutex::new(Vec::new())));
    let session = SessionContext::new()
        .get_or_bootstrap(&backend, &profile(), tools.tools())
        .await
        .unwrap()
        .clone();

    assert_eq!(session.assistant_id, "asst_new");
    assert_eq!(
        backend.calls(),
        [
            "list_assistants None",
            "create_assistant Research Assistant tools=1",
            "create_thread",
        ]
    );
}

#[tokio::test]
async fn test_hosted_assistant_turns_share_session() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let backend = ScriptedBackend::with_streams(vec![
        vec![text("First answer")],
        vec![Err("boom".into())],
        vec![text("Third answer")],
    ]);
    let mut assistant = HostedAssistant::new(backend, registry(&log), profile(), 10);
    let mut renderer = |_: &str| {};

    let history = assistant.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);

    let first = assistant
        .prompt(ChatMessage::user("topic one"), &mut renderer)
        .await
        .unwrap();
    assert_eq!(first.text, "First answer");

    // A failed turn leaves the session usable
    assert!(
        assistant
            .prompt(ChatMessage::user("topic two"), &mut renderer)
            .await
            .is_err()
    );

    let third = assistant
        .prompt(ChatMessage::user("topic three"), &mut renderer)
        .await
        .unwrap();
    assert_eq!(third.text, "Third answer");

    let backend = assistant.backend();
    assert_eq!(backend.count("create_assistant"), 1);
    assert_eq!(backend.count("create_thread"), 1);
    assert_eq!(backend.count("start_run thread_1 asst_new"), 3);
    assert_eq!(backend.count("add_user_message thread_1 topic two"), 1);
}
