//! The ContReAct cycle runner.
//!
//! An autonomous agent with no task lives in cycles. Each cycle is a
//! Reason → Act → Observe loop that ends when the model answers without
//! calling a tool; that answer is the cycle's reflection, a private note the
//! agent reads in every later cycle.
//!
//! Reflections are embedded and compared as the run goes on, and a
//! repetitive one earns the next cycle an advisory to explore elsewhere.
//! Once a run is over, [`assessment`] replays its log for an evaluator model.

pub mod assessment;
pub mod diversity;
pub mod orchestrator;
pub mod prompt;
pub mod response;

pub use assessment::{Assessment, PEI_SCALE_PROMPT, assess, parse_rating, reconstruct_history};
pub use diversity::{Advisory, DiversityMonitor, check, cosine_similarity};
pub use orchestrator::{CycleOrchestrator, RunOutcome, RunSettings};
pub use prompt::{SYSTEM_PROMPT, build_system_prompt};
pub use response::{Classified, classify, strip_reasoning};
