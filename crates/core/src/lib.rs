//! # Bookline Core
//!
//! Domain types, traits, and error definitions for the Bookline
//! appointment-booking agent. This crate has **zero framework dependencies**
//! — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, appointment store, session
//! store) is defined as a trait here or in its owning crate. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod collected;
pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod state;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use collected::{CollectedData, ESCALATION_THRESHOLD, RetryCounts};
pub use error::{Error, ProviderError, Result, SecurityError, SessionError, ToolError};
pub use message::{Message, MessageToolCall, Role, ThreadId};
pub use provider::{ModelProvider, ModelRequest, ModelResponse, ToolDefinition, Usage};
pub use session::Session;
pub use state::{ConversationState, Flow, allowed_transitions, validate_transition};
pub use tool::{Tool, ToolCall, ToolOutcome, ToolRegistry, ToolReply};
