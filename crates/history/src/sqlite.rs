//! SQLite history backend.
//!
//! One `messages` table keyed by conversation id. Each row stores the full
//! message as JSON so schema changes in the message types don't require
//! migrations; the autoincrement rowid gives a stable creation order.
//! A turn's batch is written inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::error::HistoryError;
use parley_core::history::{ConversationSummary, HistoryStore};
use parley_core::message::{ConversationId, Message};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A persistent SQLite-backed conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid             INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                payload         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages(conversation_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("conversation index: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, conversation: &ConversationId) -> Result<Vec<Message>, HistoryError> {
        let rows = sqlx::query(
            "SELECT payload FROM messages WHERE conversation_id = ? ORDER BY iid ASC",
        )
        .bind(conversation.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("load: {e}")))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            let message: Message = serde_json::from_str(&payload)
                .map_err(|e| HistoryError::Storage(format!("corrupt message row: {e}")))?;
            messages.push(message);
        }
        debug!(
            conversation = conversation.as_str(),
            count = messages.len(),
            "loaded history"
        );
        Ok(messages)
    }

    async fn append_batch(
        &self,
        conversation: &ConversationId,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HistoryError::Storage(format!("begin transaction: {e}")))?;

        for message in messages {
            let payload = serde_json::to_string(message)
                .map_err(|e| HistoryError::Storage(format!("serialize message: {e}")))?;
            sqlx::query(
                "INSERT INTO messages (conversation_id, payload, created_at) VALUES (?, ?, ?)",
            )
            .bind(conversation.as_str())
            .bind(payload)
            .bind(message.created_at().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| HistoryError::Storage(format!("insert message: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| HistoryError::Storage(format!("commit batch: {e}")))?;

        debug!(
            conversation = conversation.as_str(),
            count = messages.len(),
            "appended batch"
        );
        Ok(())
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError> {
        let rows = sqlx::query(
            "SELECT conversation_id, COUNT(*) AS message_count, MAX(created_at) AS updated_at
             FROM messages
             GROUP BY conversation_id
             ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("conversations: {e}")))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("conversation_id");
            let message_count: i64 = row.get("message_count");
            let updated_at: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| HistoryError::Storage(format!("corrupt timestamp: {e}")))?
                .with_timezone(&Utc);
            summaries.push(ConversationSummary {
                id,
                message_count: message_count as usize,
                updated_at,
            });
        }
        Ok(summaries)
    }
}
