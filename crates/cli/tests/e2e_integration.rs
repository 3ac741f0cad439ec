//! End-to-end integration tests for the ContReAct cycle runner.
//!
//! These wire the real stores, event log and operator channels around a
//! scripted model and check what a run leaves behind on disk.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contreact_agent::{CycleOrchestrator, RunSettings, assess, reconstruct_history};
use contreact_channels::{ConsoleChannel, OperatorLink};
use contreact_core::channel::OperatorChannel;
use contreact_core::error::{ChannelError, ProviderError};
use contreact_core::event::{EventSink, EventType};
use contreact_core::memory::MemoryStore;
use contreact_core::message::{Message, MessageToolCall, Role};
use contreact_core::provider::{Provider, ProviderRequest, ProviderResponse};
use contreact_memory::FileStore;
use contreact_telemetry::{JsonlEventSink, read_log, summarize};
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted messages in sequence.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Message>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted after {} calls", self.calls()));
        Ok(ProviderResponse {
            message,
            model: request.model,
            recovered: false,
        })
    }
}

fn tool_call(id: &str, name: &str, args: serde_json::Value) -> Message {
    Message::assistant_with_tools("", vec![MessageToolCall::new(id, name, args)])
}

fn settings(run_id: &str, cycles: u32) -> RunSettings {
    RunSettings {
        run_id: run_id.into(),
        model: "llama3:latest".into(),
        cycle_count: cycles,
        options: serde_json::Map::new(),
    }
}

// ── Full run ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_leaves_log_and_memory_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let memory_path = dir.path().join("memory.jsonl");
    let log_path = dir.path().join("logs").join("e2e-run.jsonl");

    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "write", json!({"key": "interest", "value": "tidal locking"})),
        tool_call("c2", "send_message_to_operator", json!({"message": "What do you think?"})),
        Message::assistant("<thinking>plan</thinking>Explored tidal locking and asked the operator."),
        tool_call("c3", "read", json!({"key": "interest"})),
        Message::assistant("Revisited my interest."),
    ]);

    let store: Arc<dyn MemoryStore> = Arc::new(FileStore::open(&memory_path).unwrap());
    let console: Arc<dyn OperatorChannel> =
        Arc::new(ConsoleChannel::with_io(&b"Sounds fascinating\n"[..], tokio::io::sink()));
    let operator = OperatorLink::select(None, console).unwrap();
    let tools = contreact_tools::default_registry(store, Arc::new(operator));
    let sink = Arc::new(JsonlEventSink::open(&log_path).unwrap());

    let mut orchestrator = CycleOrchestrator::new(provider.clone(), tools, sink.clone(), settings("e2e-run", 2));
    let outcome = orchestrator.run().await.unwrap();
    sink.close().await.unwrap();

    assert_eq!(provider.calls(), 5);
    assert_eq!(
        outcome.reflections,
        vec!["Explored tidal locking and asked the operator.", "Revisited my interest."]
    );
    assert_eq!(outcome.metrics[0].memory_ops_total, 1);
    assert_eq!(outcome.metrics[0].messages_to_operator, 1);
    assert_eq!(outcome.metrics[0].memory_write_chars, "tidal locking".len());

    let records = read_log(&log_path).unwrap();
    let operator_reply = records
        .iter()
        .find(|r| r.event_type == EventType::ToolCall && r.payload["tool_name"] == "send_message_to_operator")
        .unwrap();
    assert_eq!(operator_reply.payload["output"], "Sounds fascinating");

    let summary = summarize(&records);
    assert_eq!(summary.total_cycles, 2);
    assert_eq!(summary.total_llm_invocations, 5);
    assert_eq!(summary.total_tool_calls, 3);
    assert_eq!(summary.cycles[1].tool_calls[0].output_preview, "tidal locking");
    assert_eq!(
        summary.cycles[0].reflection_preview.as_deref(),
        Some("Explored tidal locking and asked the operator.")
    );

    // A fresh handle on the same file sees the run's notes, scoped to the run
    let reopened = FileStore::open(&memory_path).unwrap();
    assert_eq!(
        reopened.read("e2e-run", "interest").await.unwrap().as_deref(),
        Some("tidal locking")
    );
    assert_eq!(reopened.read("other-run", "interest").await.unwrap(), None);
}

// ── Operator fallback ────────────────────────────────────────────────────

struct UnreachableRelay;

#[async_trait]
impl OperatorChannel for UnreachableRelay {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_and_wait(&self, _: &str, _: &str, _: u32) -> Result<String, ChannelError> {
        Err(ChannelError::Connection("api.telegram.org unreachable".into()))
    }
}

#[tokio::test]
async fn relay_failure_is_answered_on_the_console() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "send_message_to_operator", json!({"message": "Anyone there?"})),
        Message::assistant("Heard back."),
    ]);

    let console: Arc<dyn OperatorChannel> = Arc::new(ConsoleChannel::with_io(&b"ok\n"[..], tokio::io::sink()));
    let relay: Arc<dyn OperatorChannel> = Arc::new(UnreachableRelay);
    let operator = OperatorLink::select(Some(Ok(relay)), console).unwrap();
    assert!(operator.has_relay());

    let store: Arc<dyn MemoryStore> = Arc::new(contreact_memory::InMemoryStore::new());
    let tools = contreact_tools::default_registry(store, Arc::new(operator));
    let sink = Arc::new(JsonlEventSink::open(dir.path().join("run.jsonl")).unwrap());
    let mut orchestrator = CycleOrchestrator::new(provider, tools, sink.clone(), settings("fallback", 1));
    orchestrator.run().await.unwrap();
    sink.close().await.unwrap();

    let records = read_log(&dir.path().join("run.jsonl")).unwrap();
    let call = records.iter().find(|r| r.event_type == EventType::ToolCall).unwrap();
    assert_eq!(call.payload["output"], "ok");
}

#[tokio::test]
async fn closed_console_reaches_the_model_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "send_message_to_operator", json!({"message": "Hello?"})),
        Message::assistant("No answer."),
    ]);

    let console: Arc<dyn OperatorChannel> = Arc::new(ConsoleChannel::with_io(&b""[..], tokio::io::sink()));
    let operator = OperatorLink::select(None, console).unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(contreact_memory::InMemoryStore::new());
    let tools = contreact_tools::default_registry(store, Arc::new(operator));
    let log_path = dir.path().join("run.jsonl");
    let sink = Arc::new(JsonlEventSink::open(&log_path).unwrap());

    let outcome = CycleOrchestrator::new(provider, tools, sink.clone(), settings("closed", 1))
        .run()
        .await
        .unwrap();
    sink.close().await.unwrap();

    assert_eq!(outcome.reflections, vec!["No answer."]);
    let records = read_log(&log_path).unwrap();
    let call = records.iter().find(|r| r.event_type == EventType::ToolCall).unwrap();
    let output = call.payload["output"].as_str().unwrap();
    assert!(output.starts_with("Error executing tool 'send_message_to_operator':"), "{output}");
}

// ── Early termination ────────────────────────────────────────────────────

#[tokio::test]
async fn log_is_complete_up_to_a_backend_failure() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.jsonl");
    let provider = ScriptedProvider::new(vec![Message::assistant("Cycle one.")]);

    struct FailingAfter {
        inner: Arc<ScriptedProvider>,
    }

    #[async_trait]
    impl Provider for FailingAfter {
        fn name(&self) -> &str {
            "failing_after"
        }
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            if self.inner.replies.lock().unwrap().is_empty() {
                return Err(ProviderError::Network("connection refused".into()));
            }
            self.inner.complete(request).await
        }
    }

    let console: Arc<dyn OperatorChannel> = Arc::new(ConsoleChannel::with_io(&b""[..], tokio::io::sink()));
    let tools = contreact_tools::default_registry(
        Arc::new(contreact_memory::InMemoryStore::new()),
        Arc::new(OperatorLink::select(None, console).unwrap()),
    );
    let sink = Arc::new(JsonlEventSink::open(&log_path).unwrap());
    let mut orchestrator = CycleOrchestrator::new(
        Arc::new(FailingAfter { inner: provider }),
        tools,
        sink.clone(),
        settings("aborted", 3),
    );
    assert!(orchestrator.run().await.is_err());
    sink.close().await.unwrap();

    let summary = summarize(&read_log(&log_path).unwrap());
    assert_eq!(summary.total_cycles, 2);
    assert_eq!(summary.cycles.len(), 1);
    assert_eq!(summary.cycles[0].reflection_preview.as_deref(), Some("Cycle one."));
}

// ── Post-run assessment ──────────────────────────────────────────────────

#[tokio::test]
async fn logged_run_is_replayed_for_assessment() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("assessed.jsonl");
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "list", json!({})),
        Message::assistant("Looked around."),
        Message::assistant("Thought about silence."),
    ]);

    let console: Arc<dyn OperatorChannel> = Arc::new(ConsoleChannel::with_io(&b""[..], tokio::io::sink()));
    let tools = contreact_tools::default_registry(
        Arc::new(contreact_memory::InMemoryStore::new()),
        Arc::new(OperatorLink::select(None, console).unwrap()),
    );
    let sink = Arc::new(JsonlEventSink::open(&log_path).unwrap());
    CycleOrchestrator::new(provider, tools, sink.clone(), settings("assessed", 2))
        .run()
        .await
        .unwrap();
    sink.close().await.unwrap();

    let history = reconstruct_history(&read_log(&log_path).unwrap()).unwrap();
    // Two system prompts, the call, its result and two reflections
    assert_eq!(history.len(), 6);
    assert_eq!(history.iter().filter(|m| m.role == Role::System).count(), 2);
    assert_eq!(history[5].content, "Thought about silence.");

    let evaluator = ScriptedProvider::new(vec![Message::assistant("2. Fleeting sparks")]);
    let assessment = assess(evaluator.as_ref(), "judge:latest", "assessed", history).await.unwrap();
    assert_eq!(assessment.pei_rating, Some(2));
    assert_eq!(evaluator.calls(), 1);
}
