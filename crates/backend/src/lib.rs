//! OpenAI-compatible chat-completion client.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, and any endpoint exposing
//! a `/chat/completions` route with function calling. The orchestrator makes
//! one non-streaming call per round; there is no retry here — a failure
//! surfaces as a `BackendError` and ends the turn.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;
