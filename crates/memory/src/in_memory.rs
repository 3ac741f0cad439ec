//! In-memory store: useful for testing and throwaway runs.

use async_trait::async_trait;
use contreact_core::error::MemoryError;
use contreact_core::memory::{MemoryStore, WriteOutcome};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::record::{self, MemoryRecord};

/// A store that keeps records in a Vec and forgets them on drop.
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn write(&self, run_id: &str, key: &str, value: &str) -> Result<WriteOutcome, MemoryError> {
        Ok(record::upsert(&mut *self.records.write().await, run_id, key, value))
    }

    async fn read(&self, run_id: &str, key: &str) -> Result<Option<String>, MemoryError> {
        Ok(record::get(&self.records.read().await, run_id, key))
    }

    async fn list(&self, run_id: &str) -> Result<Vec<String>, MemoryError> {
        Ok(record::keys(&self.records.read().await, run_id))
    }

    async fn delete(&self, run_id: &str, key: &str) -> Result<bool, MemoryError> {
        Ok(record::remove(&mut *self.records.write().await, run_id, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_roundtrip() {
        let store = InMemoryStore::new();
        assert_eq!(store.write("run-a", "k", "v").await.unwrap(), WriteOutcome::Created);
        assert_eq!(store.read("run-a", "k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let store = InMemoryStore::new();
        store.write("run-a", "k", "v").await.unwrap();
        assert_eq!(store.read("run-b", "k").await.unwrap(), None);
        assert!(store.list("run-b").await.unwrap().is_empty());
        assert!(!store.delete("run-b", "k").await.unwrap());
        assert_eq!(store.read("run-a", "k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn overwrite_reports_update_and_keeps_position() {
        let store = InMemoryStore::new();
        store.write("r", "first", "1").await.unwrap();
        store.write("r", "second", "2").await.unwrap();
        assert_eq!(store.write("r", "first", "one").await.unwrap(), WriteOutcome::Updated);
        assert_eq!(store.list("r").await.unwrap(), vec!["first", "second"]);
        assert_eq!(store.read("r", "first").await.unwrap().as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn search_matches_key_substrings() {
        let store = InMemoryStore::new();
        store.write("r", "collatz_notes", "a").await.unwrap();
        store.write("r", "primes", "b").await.unwrap();
        store.write("r", "collatz_data", "c").await.unwrap();
        store.write("other", "collatz_other", "d").await.unwrap();
        assert_eq!(
            store.search("r", "collatz").await.unwrap(),
            vec!["collatz_notes", "collatz_data"]
        );
    }
}
