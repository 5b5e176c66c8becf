//! ChatBackend trait — the abstraction over the chat-completion API.
//!
//! The orchestrator makes exactly one `complete` call per round. There is no
//! retry at this boundary: a failed call ends the turn.

use crate::error::BackendError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool made available to the completion backend: name, description,
/// and a JSON Schema for its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One chat-completion request: the full conversation context for a round
/// plus the tool catalogue.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The backend's answer for one round: either plain text or a list of
/// requested tool calls, carried on a single assistant message.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub model: String,
    pub usage: Option<Usage>,
}

/// The chat-completion backend boundary.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logging (e.g. "openrouter").
    fn name(&self) -> &str;

    /// Send one completion request and await the full response.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;
}
