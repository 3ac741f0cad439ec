//! Error types for the ContReAct domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type. Anything that reaches the orchestrator as an
/// `Error` terminates the run.
///
/// Channel and tool failures have no variant here: the dispatcher turns them
/// into tool output text.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Embedding errors ---
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Event log errors ---
    #[error("Event log error: {0}")]
    Event(#[from] EventError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding model returned no vector for input")]
    Empty,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failures of an operator channel.
///
/// Only [`ChannelError::Connection`] and [`ChannelError::Timeout`] are
/// recoverable by falling back to the console.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel configuration error: {0}")]
    Configuration(String),

    #[error("Channel connection failed: {0}")]
    Connection(String),

    #[error("No operator reply within {minutes} minute(s)")]
    Timeout { minutes: i64 },

    #[error("Message delivery failed to {recipient}: {reason}")]
    DeliveryFailed { recipient: String, reason: String },
}

impl ChannelError {
    /// Whether the exchange may be retried on the console.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    ExecutionFailed(String),

    /// The operator could not be reached on any channel.
    #[error("{0}")]
    Channel(#[from] ChannelError),

    /// The backing store itself failed; this is not a tool-level failure.
    #[error("{0}")]
    Memory(#[from] MemoryError),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to open event log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write event record: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to encode event record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Event log already closed")]
    Closed,
}
