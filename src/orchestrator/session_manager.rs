//! Process-wide registry of live sessions keyed by session id.
//!
//! A session that was closed is never restarted in place; the next
//! access for its id gets a fresh [`AgentSession`] that restores the
//! execution state saved on close.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span, Instrument};

use super::agent_session::{AgentSession, SubsystemFactories};
use crate::persistence::StateStore;

/// Session shared between the tasks of a hosting process.
pub type SharedSession = Arc<Mutex<AgentSession>>;

/// Owns every session of a hosting process.
pub struct SessionManager {
    state_store: Arc<dyn StateStore>,
    factories: SubsystemFactories,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionManager {
    /// Create an empty manager whose sessions persist into `state_store`.
    #[must_use]
    pub fn new(state_store: Arc<dyn StateStore>, factories: SubsystemFactories) -> Self {
        Self {
            state_store,
            factories,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Session registered under `session_id`, creating one if none exists
    /// or the registered one is already closed.
    ///
    /// The registry lock is never held while waiting on a session lock, so
    /// a busy session only delays callers asking for that same id.
    pub async fn get_or_create(&self, session_id: &str) -> SharedSession {
        let existing = self.sessions.read().await.get(session_id).cloned();
        if let Some(existing) = &existing {
            if !existing.lock().await.is_closed() {
                return Arc::clone(existing);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have registered or replaced the entry while
        // the registry was unlocked; keep theirs.
        if let Some(current) = sessions.get(session_id) {
            let replaced = match &existing {
                Some(stale) => !Arc::ptr_eq(current, stale),
                None => true,
            };
            if replaced {
                return Arc::clone(current);
            }
            info!(session_id, "replacing closed session");
        }

        let session = Arc::new(Mutex::new(AgentSession::with_factories(
            session_id,
            Arc::clone(&self.state_store),
            self.factories.clone(),
        )));
        sessions.insert(session_id.to_owned(), Arc::clone(&session));
        info!(session_id, "session registered");
        session
    }

    /// Session registered under `session_id`, if any.
    pub async fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Close and forget the session registered under `session_id`.
    ///
    /// Returns `false` if no such session was registered.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        let Some(session) = removed else {
            return false;
        };
        session.lock().await.close().await;
        true
    }

    /// Close and forget every registered session.
    pub async fn close_all(&self) {
        let drained: Vec<(String, SharedSession)> =
            self.sessions.write().await.drain().collect();
        let count = drained.len();

        async move {
            for (_, session) in drained {
                session.lock().await.close().await;
            }
            info!(count, "all sessions closed");
        }
        .instrument(info_span!("close_all_sessions"))
        .await;
    }

    /// Ids of the registered sessions, sorted.
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
