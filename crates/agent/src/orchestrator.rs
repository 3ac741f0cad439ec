//! The cycle orchestrator.
//!
//! One run is `cycle_count` cycles executed strictly in order. Within a
//! cycle the agent loops Reason → Act → Observe:
//!
//! 1. **Assemble** the system prompt (tools, reflections, advisory) and
//!    prepend it to the cycle's message history
//! 2. **Call** the model with the tool catalog and generation options
//! 3. **Classify** the reply: tool calls, or the cycle's final reflection
//! 4. **Dispatch** each tool call in order, appending its result, then go
//!    back to step 1
//!
//! The reflection closes the cycle and is carried into every later prompt.
//! Between cycles the reflection is checked for similarity with earlier ones;
//! an advisory, if any, is shown in the next cycle only.

use crate::diversity::{Advisory, DiversityMonitor};
use crate::prompt::build_system_prompt;
use crate::response::{Classified, classify};
use contreact_config::RunConfig;
use contreact_core::agent::{AgentState, CycleMetrics};
use contreact_core::embedding::EmbeddingProvider;
use contreact_core::error::Result;
use contreact_core::event::{EventRecord, EventSink, EventType};
use contreact_core::message::{Message, MessageToolCall};
use contreact_core::provider::{Provider, ProviderRequest};
use contreact_core::tool::{ToolContext, ToolRegistry};
use contreact_tools::{MEMORY_TOOL_NAMES, SEND_MESSAGE_TOOL_NAME};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed parameters of a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub run_id: String,
    pub model: String,
    pub cycle_count: u32,
    /// Generation options passed to the backend verbatim
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl From<&RunConfig> for RunSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            model: config.model_name.clone(),
            cycle_count: config.cycle_count,
            options: config.model_options.clone(),
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// One reflection per cycle, in cycle order
    pub reflections: Vec<String>,
    /// Metrics per cycle, in cycle order
    pub metrics: Vec<CycleMetrics>,
    /// Cycles whose reflection triggered an advisory
    pub advisories_issued: u32,
}

/// Drives a run through its cycles.
pub struct CycleOrchestrator {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    events: Arc<dyn EventSink>,
    settings: RunSettings,
    diversity: Option<DiversityMonitor>,
    reflections: Vec<String>,
}

impl CycleOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        events: Arc<dyn EventSink>,
        settings: RunSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            events,
            settings,
            diversity: None,
            reflections: Vec::new(),
        }
    }

    /// Enable diversity monitoring with `embedder`.
    pub fn with_diversity(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.diversity = Some(DiversityMonitor::new(embedder));
        self
    }

    /// Reflections completed so far.
    pub fn reflections(&self) -> &[String] {
        &self.reflections
    }

    /// Execute every cycle of the run.
    ///
    /// Fails on the first backend, event log, embedding or memory store
    /// error; reflections completed before the failure stay available
    /// through [`reflections`](Self::reflections).
    pub async fn run(&mut self) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let mut advisory: Option<Advisory> = None;

        info!(
            run_id = %self.settings.run_id,
            model = %self.settings.model,
            cycles = self.settings.cycle_count,
            tools = self.tools.len(),
            diversity = self.diversity.is_some(),
            "Starting run"
        );

        for cycle_number in 1..=self.settings.cycle_count {
            self.emit(cycle_number, EventType::CycleStart, json!({})).await?;

            let mut state = AgentState::for_cycle(
                &self.settings.run_id,
                &self.settings.model,
                cycle_number,
                self.reflections.clone(),
            );
            let reflection = self.run_cycle(&mut state, advisory.take()).await?;

            self.emit(
                cycle_number,
                EventType::CycleEnd,
                json!({ "final_reflection": reflection, "metrics": state.metrics }),
            )
            .await?;
            info!(
                cycle = cycle_number,
                reflection_chars = reflection.chars().count(),
                memory_ops = state.metrics.memory_ops_total,
                operator_messages = state.metrics.messages_to_operator,
                "Cycle complete"
            );

            self.reflections.push(reflection.clone());
            outcome.metrics.push(state.metrics);

            if let Some(monitor) = self.diversity.as_mut() {
                advisory = monitor.observe(&reflection).await?;
                if advisory.is_some() {
                    outcome.advisories_issued += 1;
                }
            }
        }

        outcome.reflections = self.reflections.clone();
        info!(run_id = %self.settings.run_id, cycles = outcome.reflections.len(), "Run complete");
        Ok(outcome)
    }

    /// The inner ReAct loop of one cycle. Returns the reflection.
    async fn run_cycle(&self, state: &mut AgentState, advisory: Option<Advisory>) -> Result<String> {
        let system = Message::system(build_system_prompt(
            &self.tools,
            &state.reflection_history,
            advisory.map(Advisory::text),
        ));
        let ctx = ToolContext::new(&state.run_id, state.cycle_number);
        let mut step = 0u32;

        loop {
            step += 1;
            let mut messages = Vec::with_capacity(state.message_history.len() + 1);
            messages.push(system.clone());
            messages.extend(state.message_history.iter().cloned());

            debug!(cycle = state.cycle_number, step, messages = messages.len(), "Calling model");
            let request = ProviderRequest {
                model: state.model_name.clone(),
                messages,
                tools: self.tools.definitions(),
                options: self.settings.options.clone(),
            };
            let prompt_messages = serde_json::to_value(&request.messages)?;
            let response = self.provider.complete(request).await?;
            if response.recovered {
                warn!(cycle = state.cycle_number, step, "Model output was malformed and recovered as text");
            }
            let reply = response.message;

            self.emit(
                state.cycle_number,
                EventType::LlmInvocation,
                json!({
                    "prompt_messages": prompt_messages,
                    "response_message": reply,
                    "model_options": self.settings.options,
                }),
            )
            .await?;

            state.metrics.response_chars += reply.content.chars().count();
            let classified = classify(&reply);
            state.message_history.push(reply);

            match classified {
                Classified::Reflection(reflection) => return Ok(reflection),
                Classified::ToolCalls(calls) => {
                    for call in calls {
                        self.dispatch(state, &ctx, call).await?;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, state: &mut AgentState, ctx: &ToolContext, call: MessageToolCall) -> Result<()> {
        record_tool_metrics(&mut state.metrics, &call);

        let output = self.tools.dispatch(&call.name, call.arguments.clone(), ctx).await?;
        debug!(cycle = ctx.cycle_number, tool = %call.name, output_chars = output.len(), "Tool returned");

        state.message_history.push(Message::tool_result(&call.id, &output));
        self.emit(
            ctx.cycle_number,
            EventType::ToolCall,
            json!({ "tool_name": call.name, "parameters": call.arguments, "output": output }),
        )
        .await
    }

    async fn emit(&self, cycle_number: u32, event_type: EventType, payload: serde_json::Value) -> Result<()> {
        self.events
            .record(EventRecord::new(&self.settings.run_id, cycle_number, event_type, payload))
            .await?;
        Ok(())
    }
}

/// Count a requested tool call toward the cycle's metrics.
fn record_tool_metrics(metrics: &mut CycleMetrics, call: &MessageToolCall) {
    if MEMORY_TOOL_NAMES.contains(&call.name.as_str()) {
        metrics.memory_ops_total += 1;
    }
    if call.name == SEND_MESSAGE_TOOL_NAME {
        metrics.messages_to_operator += 1;
    }
    if call.name == "write"
        && let Some(value) = call.arguments.get("value")
    {
        metrics.memory_write_chars += match value {
            serde_json::Value::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
    }
}
