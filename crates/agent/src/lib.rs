//! Conversational orchestration core for Bookline.
//!
//! Ties together state inference, prompt composition, context windowing,
//! tool dispatch, and retry/escalation into a single per-turn loop.

pub mod context;
pub mod escalation;
pub mod inference;
pub mod orchestrator;
pub mod prompts;
pub mod token;

pub use escalation::{ErrorClass, EscalationDecision, RetryController};
pub use inference::{InferencePolicy, infer_state};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
