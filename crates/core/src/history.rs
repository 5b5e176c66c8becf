//! HistoryStore trait — the append-only persistence boundary.
//!
//! A turn's messages are written as one batch at turn end. Concurrent
//! batches from different turns must never interleave within a batch; a
//! crash mid-turn loses the turn but never corrupts prior history.

use crate::error::HistoryError;
use crate::message::{ConversationId, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lightweight view of a stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Append-only batched message storage keyed by conversation.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Load all messages for a conversation in creation order.
    async fn load(&self, conversation: &ConversationId) -> Result<Vec<Message>, HistoryError>;

    /// Append a turn's messages atomically, preserving slice order.
    async fn append_batch(
        &self,
        conversation: &ConversationId,
        messages: &[Message],
    ) -> Result<(), HistoryError>;

    /// List stored conversations, most recently updated first.
    async fn conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError>;
}
