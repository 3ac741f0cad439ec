//! Agent state and per-cycle metrics.

use serde::{Deserialize, Serialize};
use crate::message::Message;

/// State of one cycle.
///
/// `message_history` is cycle-local working memory and starts empty.
/// `reflection_history` is a copy of the run's reflections so far.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub run_id: String,
    pub cycle_number: u32,
    pub model_name: String,
    pub message_history: Vec<Message>,
    pub reflection_history: Vec<String>,
    pub metrics: CycleMetrics,
}

impl AgentState {
    /// Fresh state for `cycle_number`, seeded with the reflections so far.
    pub fn for_cycle(
        run_id: impl Into<String>,
        model_name: impl Into<String>,
        cycle_number: u32,
        reflection_history: Vec<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            cycle_number,
            model_name: model_name.into(),
            message_history: Vec::new(),
            reflection_history,
            metrics: CycleMetrics::default(),
        }
    }
}

/// Counters for one cycle, attached to its `CYCLE_END` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleMetrics {
    /// Memory tool invocations
    pub memory_ops_total: u32,
    /// `send_message_to_operator` invocations
    pub messages_to_operator: u32,
    /// Characters across all model responses
    pub response_chars: usize,
    /// Characters of values passed to `write`
    pub memory_write_chars: usize,
}
