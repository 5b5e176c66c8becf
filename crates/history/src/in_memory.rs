//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::HistoryError;
use parley_core::history::{ConversationSummary, HistoryStore};
use parley_core::message::{ConversationId, Message};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps conversations in a HashMap.
/// Useful for tests and sessions where persistence isn't needed.
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, conversation: &ConversationId) -> Result<Vec<Message>, HistoryError> {
        let map = self.conversations.read().await;
        Ok(map.get(conversation.as_str()).cloned().unwrap_or_default())
    }

    async fn append_batch(
        &self,
        conversation: &ConversationId,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut map = self.conversations.write().await;
        map.entry(conversation.as_str().to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError> {
        let map = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = map
            .iter()
            .map(|(id, messages)| ConversationSummary {
                id: id.clone(),
                message_count: messages.len(),
                updated_at: messages
                    .last()
                    .map(|m| m.created_at())
                    .unwrap_or_else(Utc::now),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_load() {
        let store = InMemoryStore::new();
        let conv = ConversationId::new();

        store
            .append_batch(&conv, &[Message::user("q"), Message::assistant("a")])
            .await
            .unwrap();

        let loaded = store.load(&conv).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content(), "q");
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.load(&ConversationId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summaries_count_messages() {
        let store = InMemoryStore::new();
        let conv = ConversationId::new();
        store
            .append_batch(&conv, &[Message::user("one")])
            .await
            .unwrap();

        let summaries = store.conversations().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 1);
    }
}
