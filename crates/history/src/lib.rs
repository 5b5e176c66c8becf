//! Conversation history persistence backends.
//!
//! The default backend is SQLite ([`SqliteStore`]); [`InMemoryStore`] keeps
//! everything in process memory and is mostly useful for tests.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
