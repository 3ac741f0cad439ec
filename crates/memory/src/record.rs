//! The stored unit and the run-scoped operations shared by every store.

use chrono::{DateTime, Utc};
use contreact_core::memory::WriteOutcome;
use serde::{Deserialize, Serialize};

/// One key of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub run_id: String,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(run_id: &str, key: &str, value: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn is(&self, run_id: &str, key: &str) -> bool {
        self.run_id == run_id && self.key == key
    }
}

pub(crate) fn upsert(records: &mut Vec<MemoryRecord>, run_id: &str, key: &str, value: &str) -> WriteOutcome {
    match records.iter_mut().find(|r| r.is(run_id, key)) {
        Some(existing) => {
            existing.value = value.to_string();
            existing.updated_at = Utc::now();
            WriteOutcome::Updated
        }
        None => {
            records.push(MemoryRecord::new(run_id, key, value));
            WriteOutcome::Created
        }
    }
}

pub(crate) fn get(records: &[MemoryRecord], run_id: &str, key: &str) -> Option<String> {
    records.iter().find(|r| r.is(run_id, key)).map(|r| r.value.clone())
}

pub(crate) fn keys(records: &[MemoryRecord], run_id: &str) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.run_id == run_id)
        .map(|r| r.key.clone())
        .collect()
}

pub(crate) fn remove(records: &mut Vec<MemoryRecord>, run_id: &str, key: &str) -> bool {
    let before = records.len();
    records.retain(|r| !r.is(run_id, key));
    records.len() < before
}
