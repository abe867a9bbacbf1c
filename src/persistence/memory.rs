//! In-process state store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::store::StateStore;
use crate::{AppError, BoxFuture};

/// State store kept in memory; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    states: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a stored blob.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    /// Whether no session has a stored blob.
    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, session_id: &str, blob: Vec<u8>) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move {
            self.states.write().await.insert(session_id, blob);
            Ok(())
        })
    }

    fn restore(&self, session_id: &str) -> BoxFuture<'_, Vec<u8>> {
        let session_id = session_id.to_owned();
        Box::pin(async move {
            self.states
                .read()
                .await
                .get(&session_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::NotFound(format!("no state stored for session '{session_id}'"))
                })
        })
    }

    fn delete(&self, session_id: &str) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move {
            self.states.write().await.remove(&session_id);
            Ok(())
        })
    }
}
