//! Incremental SSE frame decoding.
//!
//! The connection delivers bytes in chunks that can split a frame anywhere,
//! including mid-line and mid-UTF-8-sequence. The decoder keeps a carry-over
//! buffer and only consumes complete newline-terminated lines; whatever
//! trails the last newline waits for the next chunk.

use parley_core::event::StreamEvent;
use tracing::debug;

/// One decoded `event:`/`data:` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    /// Decode the frame into a [`StreamEvent`].
    ///
    /// Returns `None` for unknown event names or undecodable payloads —
    /// malformed frames are skipped, never fatal.
    pub fn decode(&self) -> Option<StreamEvent> {
        let mut payload: serde_json::Value = serde_json::from_str(&self.data).ok()?;
        let map = payload.as_object_mut()?;
        map.insert("type".into(), serde_json::Value::String(self.event.clone()));
        match serde_json::from_value(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(event = %self.event, error = %e, "Skipping undecodable frame");
                None
            }
        }
    }
}

/// Incremental decoder over the raw byte stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes after the last consumed newline.
    buffer: Vec<u8>,
    /// `event:` line of the frame being assembled.
    event: Option<String>,
    /// Accumulated `data:` lines of the frame being assembled.
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        // Consume only through the last newline; the tail may end mid-line
        // or mid-character.
        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let consumed: Vec<u8> = self.buffer.drain(..=last_newline).collect();

        // The drained bytes end with '\n', so split's final piece is always
        // empty and not a real blank line.
        let mut lines: Vec<&[u8]> = consumed.split(|&b| b == b'\n').collect();
        lines.pop();

        let mut frames = Vec::new();
        for raw_line in lines {
            let line = String::from_utf8_lossy(raw_line);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data.push(rest.trim_start().to_string());
            }
            // other field lines (id:, retry:, comments) are ignored
        }
        frames
    }

    /// Finish the frame under assembly, if it has any content.
    fn take_frame(&mut self) -> Option<Frame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_default();
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Frame { event, data })
    }
}
