//! Experiment event logging and log analysis for ContReAct.
//!
//! The event log is the record of a run: every cycle boundary, model
//! invocation and tool call, one JSON object per line. This crate writes it
//! ([`JsonlEventSink`]), captures it in memory for tests ([`RecordingSink`])
//! and folds it back into a per-cycle summary ([`summary::summarize`]).

pub mod sink;
pub mod summary;

pub use sink::{JsonlEventSink, RecordingSink};
pub use summary::{CycleSummary, RunSummary, read_log, summarize};

/// Errors from reading an event log back.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to read event log {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}
