//! Live-stream session tracking.
//!
//! One handle per open event stream. Handles are inserted when a stream
//! starts and removed by the forwarding task when the turn completes or the
//! client disconnects. The registry is injected into the gateway state, not
//! a global.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One live turn stream.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHandle {
    pub id: String,
    pub conversation_id: String,
    pub started_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            started_at: Utc::now(),
        }
    }
}

/// Concurrent map of live sessions keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; returns its id.
    pub async fn insert(&self, handle: SessionHandle) -> String {
        let id = handle.id.clone();
        self.sessions.write().await.insert(id.clone(), handle);
        id
    }

    /// Remove a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Snapshot of live sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionHandle> {
        let mut sessions: Vec<SessionHandle> =
            self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_list_remove() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let id = registry.insert(SessionHandle::new("conv-1")).await;
        registry.insert(SessionHandle::new("conv-2")).await;
        assert_eq!(registry.len().await, 2);

        let listed = registry.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].conversation_id, "conv-1");

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert_eq!(registry.len().await, 1);
    }
}
