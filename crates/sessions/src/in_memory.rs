//! In-memory session store — useful for testing and single-process
//! deployments without durability requirements.

use async_trait::async_trait;
use bookline_core::error::SessionError;
use bookline_core::message::ThreadId;
use bookline_core::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::store::SessionStore;

/// Sessions held in a map of per-thread slots. Each slot carries its own
/// lock so writes to one thread serialize without blocking other threads.
pub struct InMemorySessionStore {
    threads: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    /// (session_id, org_id) → thread id mapping
    aliases: RwLock<HashMap<(String, String), ThreadId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
        }
    }

    /// Number of known threads (test helper).
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create_thread(
        &self,
        session_id: &str,
        org_id: &str,
    ) -> Result<ThreadId, SessionError> {
        let key = (session_id.to_string(), org_id.to_string());
        if let Some(existing) = self.aliases.read().await.get(&key) {
            return Ok(existing.clone());
        }

        let mut aliases = self.aliases.write().await;
        // Double-check after taking the write lock
        if let Some(existing) = aliases.get(&key) {
            return Ok(existing.clone());
        }
        let thread_id = ThreadId::new();
        aliases.insert(key, thread_id.clone());

        let session = Session::new(thread_id.clone());
        self.threads
            .write()
            .await
            .insert(thread_id.0.clone(), Arc::new(Mutex::new(session)));
        Ok(thread_id)
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Session>, SessionError> {
        let slot = {
            let threads = self.threads.read().await;
            threads.get(&thread_id.0).cloned()
        };
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let slot = {
            let threads = self.threads.read().await;
            threads.get(&session.thread_id.0).cloned()
        };
        match slot {
            Some(slot) => {
                *slot.lock().await = session.clone();
                Ok(())
            }
            None => {
                // First persist for an externally-created thread id
                self.threads.write().await.insert(
                    session.thread_id.0.clone(),
                    Arc::new(Mutex::new(session.clone())),
                );
                Ok(())
            }
        }
    }
}
