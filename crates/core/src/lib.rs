//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley conversation
//! orchestration engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (chat-completion backend, history store,
//! tool handlers) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use backend::{ChatBackend, ChatRequest, ChatResponse, ToolDefinition, Usage};
pub use error::{BackendError, Error, HistoryError, Result, ToolError};
pub use event::StreamEvent;
pub use history::{ConversationSummary, HistoryStore};
pub use message::{ConversationId, Message, Role, ToolCall};
pub use tool::{Tool, ToolRegistry, MAX_TOOL_RESULT_CHARS};
