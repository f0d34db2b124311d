//! Session store: per-user conversation state keyed by transport address.
//!
//! The engine owns one store instance; the in-memory implementation lives for the process
//! lifetime. Entries are created on first contact and never expire. States are kept in their
//! stored string form, as a persistent backend would keep them, and parsed on read.

use super::state::ConversationState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Opaque user identifier (transport address).
pub type UserId = String;

/// Get/set/delete of conversation state by user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user: &str) -> Option<ConversationState>;
    async fn set(&self, user: &str, state: ConversationState);
    async fn delete(&self, user: &str);
}

/// In-memory store for sessions.
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<UserId, String>>>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of users with a session.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: &str) -> Option<ConversationState> {
        let stored = self.inner.read().await.get(user).cloned()?;
        ConversationState::from_stored(&stored)
    }

    async fn set(&self, user: &str, state: ConversationState) {
        self.inner
            .write()
            .await
            .insert(user.to_string(), state.as_str().to_string());
    }

    async fn delete(&self, user: &str) {
        self.inner.write().await.remove(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_delete() {
        let store = InMemorySessionStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.get("a@c.us").await, None);

        store.set("a@c.us", ConversationState::Menu).await;
        store.set("a@c.us", ConversationState::Paused).await;
        assert_eq!(store.get("a@c.us").await, Some(ConversationState::Paused));
        assert_eq!(store.len().await, 1);

        store.delete("a@c.us").await;
        assert_eq!(store.get("a@c.us").await, None);
    }

    #[tokio::test]
    async fn unknown_stored_value_reads_as_no_session() {
        let store = InMemorySessionStore::new();
        store
            .inner
            .write()
            .await
            .insert("a@c.us".to_string(), "pausado".to_string());
        assert_eq!(store.get("a@c.us").await, None);
        assert_eq!(store.len().await, 1);
    }
}
