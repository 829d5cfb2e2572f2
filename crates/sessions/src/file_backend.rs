//! File-based session store — one JSON document per thread.
//!
//! Layout: `<root>/<thread_id>.json` plus a single `aliases.json` mapping
//! external (session_id, org_id) pairs to thread ids. Writes go to a temp
//! file first and are renamed into place, so a crash mid-write never leaves
//! a half-written session behind.

use async_trait::async_trait;
use bookline_core::error::SessionError;
use bookline_core::message::ThreadId;
use bookline_core::session::Session;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::SessionStore;

pub struct FileSessionStore {
    root: PathBuf,
    /// Guards the alias file; session files are independent.
    alias_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self, SessionError> {
        std::fs::create_dir_all(&root)
            .map_err(|e| SessionError::Storage(format!("create {}: {e}", root.display())))?;
        Ok(Self {
            root,
            alias_lock: Mutex::new(()),
        })
    }

    fn session_path(&self, thread_id: &ThreadId) -> PathBuf {
        self.root.join(format!("{}.json", thread_id.0))
    }

    fn alias_path(&self) -> PathBuf {
        self.root.join("aliases.json")
    }

    fn read_aliases(&self) -> HashMap<String, String> {
        match std::fs::read_to_string(self.alias_path()) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupt alias file, starting fresh");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn write_atomically(&self, path: &PathBuf, content: &str) -> Result<(), SessionError> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| SessionError::Storage(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| SessionError::Storage(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }

    fn alias_key(session_id: &str, org_id: &str) -> String {
        format!("{org_id}/{session_id}")
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_or_create_thread(
        &self,
        session_id: &str,
        org_id: &str,
    ) -> Result<ThreadId, SessionError> {
        let _guard = self.alias_lock.lock().await;
        let mut aliases = self.read_aliases();
        let key = Self::alias_key(session_id, org_id);

        if let Some(existing) = aliases.get(&key) {
            return Ok(ThreadId::from(existing));
        }

        let thread_id = ThreadId::new();
        aliases.insert(key, thread_id.0.clone());
        let content = serde_json::to_string_pretty(&aliases)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        self.write_atomically(&self.alias_path(), &content)?;

        let session = Session::new(thread_id.clone());
        self.persist(&session).await?;
        debug!(thread_id = %thread_id, "Created new session file");
        Ok(thread_id)
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Session>, SessionError> {
        let path = self.session_path(thread_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Storage(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        let session = serde_json::from_str(&content).map_err(|e| SessionError::Corrupt {
            thread_id: thread_id.0.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(session))
    }

    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        self.write_atomically(&self.session_path(&session.thread_id), &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::message::Message;
    use bookline_core::state::ConversationState;

    #[tokio::test]
    async fn roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().to_path_buf()).unwrap();

        let thread_id = store.get_or_create_thread("sess-1", "org-a").await.unwrap();
        let mut session = store.load(&thread_id).await.unwrap().unwrap();
        session.push(Message::user("cancel my appointment"));
        session.current_state = ConversationState::CancelAskConfirmation;
        store.persist(&session).await.unwrap();

        let loaded = store.load(&thread_id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(
            loaded.current_state,
            ConversationState::CancelAskConfirmation
        );
    }

    #[tokio::test]
    async fn aliases_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let t1 = {
            let store = FileSessionStore::new(dir.path().to_path_buf()).unwrap();
            store.get_or_create_thread("sess-1", "org-a").await.unwrap()
        };
        // New store over the same root resolves to the same thread
        let store = FileSessionStore::new(dir.path().to_path_buf()).unwrap();
        let t2 = store.get_or_create_thread("sess-1", "org-a").await.unwrap();
        assert_eq!(t1, t2);
    }

    #[tokio::test]
    async fn corrupt_session_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().to_path_buf()).unwrap();
        let thread_id = store.get_or_create_thread("sess-1", "org-a").await.unwrap();

        std::fs::write(dir.path().join(format!("{}.json", thread_id.0)), "not json").unwrap();
        let err = store.load(&thread_id).await.unwrap_err();
        assert!(matches!(err, SessionError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn unknown_thread_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().to_path_buf()).unwrap();
        let missing = store.load(&ThreadId::from("ghost")).await.unwrap();
        assert!(missing.is_none());
    }
}
