//! Streaming wire events.
//!
//! `StreamEvent` is the unit pushed to the client while a turn runs. On the
//! wire each event becomes one SSE frame:
//!
//! ```text
//! event: <status|tool_call|tool_result|message|error|done>
//! data: <JSON payload>
//!
//! ```
//!
//! Events are produced exclusively by the orchestrator and consumed
//! exclusively by the client-side reconstructor. They are never persisted —
//! durable state is rebuilt from messages, not from the event stream.

use serde::{Deserialize, Serialize};

/// Events emitted during one turn, in emission order:
/// zero or more (`tool_call`, `status`, `tool_result`) triples per round,
/// then `message` or `error`, then always exactly one `done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Human-readable progress line. Last-write-wins on the client.
    Status { message: String },

    /// The backend requested a tool invocation.
    ToolCall {
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// A tool invocation completed; `result` is the normalized text.
    ToolResult { tool_name: String, result: String },

    /// The final plain-text answer for the turn. Sent whole, not incrementally.
    Message { content: String },

    /// Terminal failure for the turn.
    Error { message: String },

    /// The turn is over. Always the last event on the stream.
    Done,
}

impl StreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Message { .. } => "message",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    /// The `data:` payload — variant fields only, the type travels in the
    /// `event:` line. `done` carries an empty object.
    pub fn payload_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("type");
        }
        value
    }

    /// Render this event as a complete SSE frame.
    pub fn to_sse_frame(&self) -> String {
        format!(
            "event: {}\ndata: {}\n\n",
            self.event_type(),
            self.payload_json()
        )
    }
}
