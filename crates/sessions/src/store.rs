//! SessionStore trait — the persistence seam for per-thread state.
//!
//! Writes for one thread are serialized by the store; writes to different
//! threads may proceed concurrently. Idle expiry is an external concern and
//! not part of this contract.

use async_trait::async_trait;
use bookline_core::error::SessionError;
use bookline_core::message::ThreadId;
use bookline_core::session::Session;

/// Persistence backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Resolve an external (session_id, org_id) pair to a thread id,
    /// creating a fresh thread on first contact.
    async fn get_or_create_thread(
        &self,
        session_id: &str,
        org_id: &str,
    ) -> Result<ThreadId, SessionError>;

    /// Load the session for a thread. `Ok(None)` if the thread is unknown.
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Session>, SessionError>;

    /// Persist the full session state. Writes for the same thread are
    /// serialized; cross-thread writes are concurrent.
    async fn persist(&self, session: &Session) -> Result<(), SessionError>;
}
