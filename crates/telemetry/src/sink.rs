//! Event sinks.
//!
//! [`JsonlEventSink`] appends to `<log_dir>/<run_id>.jsonl` and flushes after
//! every record. [`RecordingSink`] keeps records in memory.

use async_trait::async_trait;
use contreact_core::error::EventError;
use contreact_core::event::{EventRecord, EventSink, EventType};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Append-only JSON-lines event log.
///
/// Once closed, further records are rejected with [`EventError::Closed`].
pub struct JsonlEventSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonlEventSink {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EventError> {
        let path = path.into();
        let open_err = |source| EventError::Open {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        debug!(path = %path.display(), "Opened event log");
        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventSink for JsonlEventSink {
    async fn record(&self, event: EventRecord) -> Result<(), EventError> {
        let line = serde_json::to_string(&event)?;
        let mut guard = self.writer();
        let writer = guard.as_mut().ok_or(EventError::Closed)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        if let Some(mut writer) = self.writer().take() {
            writer.flush()?;
            debug!(path = %self.path.display(), "Closed event log");
        }
        Ok(())
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer().take() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), error = %e, "Failed to flush event log on drop");
            }
        }
    }
}

/// In-memory sink, for tests and dry runs.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<EventRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().clone()
    }

    /// Records of one type, in order.
    pub fn of_type(&self, event_type: EventType) -> Vec<EventRecord> {
        self.lock()
            .iter()
            .filter(|r| r.event_type == event_type)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EventRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn record(&self, event: EventRecord) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_are_flushed_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run-1.jsonl");
        let sink = JsonlEventSink::open(&path).unwrap();

        sink.record(EventRecord::new("run-1", 1, EventType::CycleStart, json!({}))).await.unwrap();
        // Visible on disk before close.
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);

        sink.record(EventRecord::new(
            "run-1",
            1,
            EventType::CycleEnd,
            json!({"final_reflection": "done"}),
        ))
        .await
        .unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "CYCLE_START");
        assert_eq!(lines[1]["payload"]["final_reflection"], "done");
        assert!(lines[1]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        for cycle in 1..=2 {
            let sink = JsonlEventSink::open(&path).unwrap();
            sink.record(EventRecord::new("r", cycle, EventType::CycleStart, json!({}))).await.unwrap();
            sink.close().await.unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn closed_sink_rejects_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlEventSink::open(dir.path().join("r.jsonl")).unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        let err = sink
            .record(EventRecord::new("r", 1, EventType::CycleStart, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Closed));
    }

    #[tokio::test]
    async fn recording_sink_filters_by_type() {
        let sink = RecordingSink::new();
        sink.record(EventRecord::new("r", 1, EventType::CycleStart, json!({}))).await.unwrap();
        sink.record(EventRecord::new("r", 1, EventType::ToolCall, json!({}))).await.unwrap();
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.of_type(EventType::ToolCall).len(), 1);
    }
}
