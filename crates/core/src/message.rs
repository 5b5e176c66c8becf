//! Message domain types.
//!
//! A `Message` is one turn unit in the conversation log. Role-specific
//! required fields (tool call lists on assistant messages, call back-references
//! on tool messages) are enforced by the variant constructors rather than by
//! optional fields on a single shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation. Scopes persisted history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call embedded in an assistant message.
///
/// `id` is assigned by the completion backend and unique within a round.
/// `arguments` is the JSON-encoded object exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A single message in a conversation.
///
/// Serializes to the conventional flat shape
/// `{role, content, tool_calls?, tool_call_id?, tool_name?, created_at}` so
/// persisted history and the backend wire format stay interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
        created_at: DateTime<Utc>,
    },
    User {
        content: String,
        created_at: DateTime<Utc>,
    },
    Assistant {
        /// May be empty when the message only carries tool calls.
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        created_at: DateTime<Utc>,
    },
    Tool {
        content: String,
        /// References a `ToolCall.id` from a preceding assistant message.
        tool_call_id: String,
        tool_name: String,
        created_at: DateTime<Utc>,
    },
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message with plain text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message carrying tool call requests.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
            created_at: Utc::now(),
        }
    }

    /// Create a tool result message answering one tool call.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content, .. }
            | Message::User { content, .. }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Message::System { created_at, .. }
            | Message::User { created_at, .. }
            | Message::Assistant { created_at, .. }
            | Message::Tool { created_at, .. } => *created_at,
        }
    }

    /// Tool calls requested by this message. Empty for non-assistant roles.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Which tool call this message answers, for `tool` role messages.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_name, .. } => Some(tool_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "Hello, agent!");
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn tool_message_requires_back_reference() {
        let msg = Message::tool_result("call_1", "list_datasets", "[]");
        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.tool_call_id(), Some("call_1"));
        assert_eq!(msg.tool_name(), Some("list_datasets"));
    }

    #[test]
    fn serialization_is_flat_and_role_tagged() {
        let msg = Message::assistant_with_calls(
            "",
            vec![ToolCall {
                id: "call_9".into(),
                name: "list_configs".into(),
                arguments: "{}".into(),
            }],
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "");
        assert_eq!(json["tool_calls"][0]["name"], "list_configs");
    }

    #[test]
    fn empty_tool_calls_are_omitted() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn serialization_roundtrip() {
        let msg = Message::tool_result("call_1", "get_dataset", "rows: 12");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role(), Role::Tool);
        assert_eq!(back.content(), "rows: 12");
        assert_eq!(back.tool_call_id(), Some("call_1"));
    }
}
