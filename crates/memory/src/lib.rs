//! Memory store implementations for ContReAct.
//!
//! Both stores keep entries in insertion order and isolate them by run id.

pub mod record;
pub mod in_memory;
pub mod file_backend;

pub use record::MemoryRecord;
pub use in_memory::InMemoryStore;
pub use file_backend::FileStore;
