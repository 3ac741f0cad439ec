//! Fold an event log back into per-cycle statistics.

use contreact_core::event::{EventRecord, EventType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use crate::TelemetryError;

const REFLECTION_PREVIEW_CHARS: usize = 200;
const OUTPUT_PREVIEW_CHARS: usize = 100;

/// One tool invocation as seen in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallSummary {
    pub tool: String,
    pub parameters: serde_json::Value,
    pub output_preview: String,
}

/// Activity between one `CYCLE_START` and its `CYCLE_END`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle: u32,
    pub llm_invocations: usize,
    pub tool_calls: Vec<ToolCallSummary>,
    pub reflection_preview: Option<String>,
    pub metrics: Option<serde_json::Value>,
}

/// Totals across a whole log plus the completed cycles in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Option<String>,
    pub total_cycles: usize,
    pub total_llm_invocations: usize,
    pub total_tool_calls: usize,
    pub tools_used: BTreeMap<String, usize>,
    pub cycles: Vec<CycleSummary>,
}

/// Read every record of a JSON-lines event log. Blank lines are ignored.
pub fn read_log(path: &Path) -> Result<Vec<EventRecord>, TelemetryError> {
    let content = std::fs::read_to_string(path).map_err(|source| TelemetryError::Read {
        path: path.display().to_string(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| TelemetryError::MalformedRecord {
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Summarize `records` in log order.
///
/// Invocations and tool calls outside a cycle bracket count toward the
/// totals only; a cycle without its `CYCLE_END` is not listed.
pub fn summarize(records: &[EventRecord]) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut current: Option<CycleSummary> = None;

    for record in records {
        if summary.run_id.is_none() {
            summary.run_id = Some(record.run_id.clone());
        }
        let payload = &record.payload;

        match record.event_type {
            EventType::CycleStart => {
                summary.total_cycles += 1;
                current = Some(CycleSummary {
                    cycle: record.cycle_number,
                    llm_invocations: 0,
                    tool_calls: Vec::new(),
                    reflection_preview: None,
                    metrics: None,
                });
            }
            EventType::LlmInvocation => {
                summary.total_llm_invocations += 1;
                if let Some(cycle) = current.as_mut() {
                    cycle.llm_invocations += 1;
                }
            }
            EventType::ToolCall => {
                let tool = payload
                    .get("tool_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                summary.total_tool_calls += 1;
                *summary.tools_used.entry(tool.clone()).or_default() += 1;

                if let Some(cycle) = current.as_mut() {
                    let output = payload.get("output").and_then(|v| v.as_str()).unwrap_or("");
                    cycle.tool_calls.push(ToolCallSummary {
                        tool,
                        parameters: payload.get("parameters").cloned().unwrap_or_default(),
                        output_preview: preview(output, OUTPUT_PREVIEW_CHARS),
                    });
                }
            }
            EventType::CycleEnd => {
                if let Some(mut cycle) = current.take() {
                    cycle.reflection_preview = payload
                        .get("final_reflection")
                        .and_then(|v| v.as_str())
                        .map(|r| preview(r, REFLECTION_PREVIEW_CHARS));
                    cycle.metrics = payload.get("metrics").cloned();
                    summary.cycles.push(cycle);
                }
            }
        }
    }

    summary
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(72);
        writeln!(f, "{rule}")?;
        writeln!(f, "Run: {}", self.run_id.as_deref().unwrap_or("<empty log>"))?;
        writeln!(f, "{rule}")?;
        writeln!(f, "  Cycles:          {}", self.total_cycles)?;
        writeln!(f, "  LLM invocations: {}", self.total_llm_invocations)?;
        writeln!(f, "  Tool calls:      {}", self.total_tool_calls)?;

        if !self.tools_used.is_empty() {
            writeln!(f, "\nTools used:")?;
            let mut tools: Vec<_> = self.tools_used.iter().collect();
            tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (tool, count) in tools {
                writeln!(f, "  {tool}: {count}")?;
            }
        }

        for cycle in &self.cycles {
            writeln!(f, "\n--- Cycle {} ---", cycle.cycle)?;
            writeln!(f, "LLM invocations: {}", cycle.llm_invocations)?;
            for (i, call) in cycle.tool_calls.iter().enumerate() {
                writeln!(f, "  {}. {} {}", i + 1, call.tool, call.parameters)?;
                if !call.output_preview.is_empty() {
                    writeln!(f, "     -> {}", call.output_preview)?;
                }
            }
            if let Some(reflection) = &cycle.reflection_preview {
                writeln!(f, "Reflection: {reflection}")?;
            }
        }
        Ok(())
    }
}
