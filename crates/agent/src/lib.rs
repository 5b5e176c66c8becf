//! Turn orchestration — the bounded multi-round loop between the chat
//! backend and the tool registry.

pub mod turn_runner;

pub use turn_runner::{DEFAULT_MAX_ROUNDS, DEFAULT_SYSTEM_PROMPT, TurnRunner};
