//! Folding decoded events into a renderable message list.
//!
//! One `Transcript` tracks a whole conversation on the client. A turn starts
//! with `begin_turn` (optimistic user message + streaming assistant
//! placeholder) and ends when `message`/`error` plus `done` arrive. Pending
//! tool calls are matched to results through per-name FIFO queues, so
//! duplicate tool names within a turn resolve in request order.

use parley_core::event::StreamEvent;
use parley_core::message::Role;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// One tool invocation as rendered in the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct UiToolCall {
    pub name: String,
    pub args: serde_json::Value,
    /// `None` while the call is still running.
    pub result: Option<String>,
}

/// One rendered message.
#[derive(Debug, Clone, PartialEq)]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<UiToolCall>,
    pub is_streaming: bool,
}

impl UiMessage {
    fn new(role: Role, content: impl Into<String>, is_streaming: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            is_streaming,
        }
    }
}

/// The client-side turn state machine.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<UiMessage>,
    /// Last-write-wins progress line; cleared when the turn ends.
    status: Option<String>,
    /// Per-tool-name queues of unresolved tool-call indices, popped FIFO.
    pending: HashMap<String, VecDeque<usize>>,
    /// Index of the streaming assistant placeholder, while a turn runs.
    streaming: Option<usize>,
    /// Set by `cancel`; suppresses all further events.
    aborted: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Start a turn: append the user's message (immutable after creation)
    /// and a streaming assistant placeholder.
    pub fn begin_turn(&mut self, user_text: impl Into<String>) {
        self.aborted = false;
        self.pending.clear();
        self.messages
            .push(UiMessage::new(Role::User, user_text, false));
        self.messages
            .push(UiMessage::new(Role::Assistant, "", true));
        self.streaming = Some(self.messages.len() - 1);
    }

    /// Abort the turn. Later events — including the error the abort itself
    /// may produce — are ignored, and the placeholder is finalized without
    /// an error message.
    pub fn cancel(&mut self) {
        self.aborted = true;
        self.finish_turn();
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: StreamEvent) {
        if self.aborted {
            return;
        }
        match event {
            StreamEvent::Status { message } => {
                self.status = Some(message);
            }
            StreamEvent::ToolCall {
                tool_name,
                arguments,
            } => {
                if let Some(idx) = self.streaming {
                    let calls = &mut self.messages[idx].tool_calls;
                    calls.push(UiToolCall {
                        name: tool_name.clone(),
                        args: arguments,
                        result: None,
                    });
                    self.pending
                        .entry(tool_name)
                        .or_default()
                        .push_back(calls.len() - 1);
                }
            }
            StreamEvent::ToolResult { tool_name, result } => {
                let popped = self
                    .pending
                    .get_mut(&tool_name)
                    .and_then(|queue| queue.pop_front());
                if let (Some(idx), Some(call_idx)) = (self.streaming, popped) {
                    self.messages[idx].tool_calls[call_idx].result = Some(result);
                }
            }
            StreamEvent::Message { content } => {
                // Full replacement; the final text arrives whole.
                if let Some(idx) = self.streaming {
                    self.messages[idx].content = content;
                }
            }
            StreamEvent::Error { message } => {
                if let Some(idx) = self.streaming {
                    self.messages[idx].content = format!("Error: {message}");
                }
                self.finish_turn();
            }
            StreamEvent::Done => {
                self.finish_turn();
            }
        }
    }

    fn finish_turn(&mut self) {
        if let Some(idx) = self.streaming.take() {
            self.messages[idx].is_streaming = false;
        }
        self.status = None;
        self.pending.clear();
    }
}
