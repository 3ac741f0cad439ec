//! Experiment event records and the append-only sink they are written to.
//!
//! The event log is experiment data, not diagnostics: one JSON object per
//! record, never mutated after it is written.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use crate::error::EventError;

/// The kinds of records a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CycleStart,
    LlmInvocation,
    ToolCall,
    CycleEnd,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CycleStart => "CYCLE_START",
            Self::LlmInvocation => "LLM_INVOCATION",
            Self::ToolCall => "TOOL_CALL",
            Self::CycleEnd => "CYCLE_END",
        };
        f.write_str(s)
    }
}

/// A single line of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// UTC, millisecond precision, `Z` suffix
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub cycle_number: u32,
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        run_id: impl Into<String>,
        cycle_number: u32,
        event_type: EventType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id: run_id.into(),
            cycle_number,
            event_type,
            payload,
        }
    }
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Append-only destination for event records.
///
/// Implementations persist every record before returning. `close` is
/// idempotent and must be called on both normal and early termination.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: EventRecord) -> std::result::Result<(), EventError>;

    async fn close(&self) -> std::result::Result<(), EventError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_serializes_with_millisecond_utc_timestamp() {
        let mut record = EventRecord::new("run-1", 2, EventType::LlmInvocation, serde_json::json!({}));
        record.timestamp = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2025-01-02T03:04:05.000Z");
        assert_eq!(json["event_type"], "LLM_INVOCATION");
        assert_eq!(json["cycle_number"], 2);
    }

    #[test]
    fn record_parses_back() {
        let line = r#"{"timestamp":"2025-01-02T03:04:05.123Z","run_id":"r","cycle_number":1,"event_type":"CYCLE_END","payload":{"final_reflection":"x"}}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.event_type, EventType::CycleEnd);
        assert_eq!(record.payload["final_reflection"], "x");
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(EventType::ToolCall.to_string(), "TOOL_CALL");
    }
}
