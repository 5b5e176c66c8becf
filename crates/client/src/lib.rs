//! Client-side reconstruction of a turn from the event stream.
//!
//! [`FrameDecoder`] turns raw connection bytes into framed events, surviving
//! arbitrary chunk boundaries. [`Transcript`] folds decoded events into an
//! ordered, renderable message list with live-updating placeholders.

pub mod decoder;
pub mod transcript;

pub use decoder::{Frame, FrameDecoder};
pub use transcript::{Transcript, UiMessage, UiToolCall};
