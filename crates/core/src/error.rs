//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures from the chat-completion backend.
///
/// All of these are terminal for the current turn: the round loop stops,
/// accumulated messages are still persisted, and `done` is still emitted.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("LLM API error: {status_code} {message}")]
    Api { status_code: u16, message: String },

    #[error("LLM returned no response")]
    NoChoices,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

/// Failures during tool dispatch.
///
/// None of these terminate a turn — the registry flattens them into
/// tool-result text so the model can self-correct.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("extraction service error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("request failed: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
