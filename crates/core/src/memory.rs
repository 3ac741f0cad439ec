//! Memory trait: the agent's persistent key-value notebook.
//!
//! Every operation is scoped by run id: two runs never see each other's keys.
//! Keys are returned in insertion order.

use async_trait::async_trait;
use crate::error::MemoryError;

/// Whether a write created a key or replaced an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Human-readable backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Store `value` under `key`, replacing any previous value.
    async fn write(&self, run_id: &str, key: &str, value: &str) -> std::result::Result<WriteOutcome, MemoryError>;

    /// Read the value under `key`, if any.
    async fn read(&self, run_id: &str, key: &str) -> std::result::Result<Option<String>, MemoryError>;

    /// All keys of the run.
    async fn list(&self, run_id: &str) -> std::result::Result<Vec<String>, MemoryError>;

    /// Remove `key`. Returns `false` when it did not exist.
    async fn delete(&self, run_id: &str, key: &str) -> std::result::Result<bool, MemoryError>;

    /// Keys of the run containing `pattern` as a substring.
    async fn search(&self, run_id: &str, pattern: &str) -> std::result::Result<Vec<String>, MemoryError> {
        let keys = self.list(run_id).await?;
        Ok(keys.into_iter().filter(|k| k.contains(pattern)).collect())
    }
}
