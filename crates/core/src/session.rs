//! Session — the unit of per-conversation state.
//!
//! Each thread exclusively owns one `Session`; nothing is shared across
//! sessions. The serde layout of this struct is the persisted format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collected::{CollectedData, RetryCounts};
use crate::message::{Message, ThreadId};
use crate::state::ConversationState;

/// All mutable state for one conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Owning thread
    pub thread_id: ThreadId,

    /// Ordered message history
    pub messages: Vec<Message>,

    /// Current conversational state (re-derived every turn)
    pub current_state: ConversationState,

    /// Durable structured data gathered so far
    pub collected_data: CollectedData,

    /// Per-flow verification attempt counters
    pub retry_counts: RetryCounts,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session for a thread.
    pub fn new(thread_id: ThreadId) -> Self {
        let now = Utc::now();
        Self {
            thread_id,
            messages: Vec::new(),
            current_state: ConversationState::Greeting,
            collected_data: CollectedData::default(),
            retry_counts: RetryCounts::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the history.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// The most recent user message text, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::User)
            .map(|m| m.content.as_str())
    }
}
