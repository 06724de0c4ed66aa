//! Incremental decoder for the server-to-client event stream
//!
//! The stream is line-oriented:
//! ```text
//! event: endpoint\n
//! data: /message?session_id=abc123\n
//! \n
//! data: {"jsonrpc":"2.0","id":1,"result":{}}\n
//! ```
//!
//! An `event:` line names the event of the *next* `data:` line. Every
//! `data:` line yields one [`Frame`] and resets the event name to
//! `message`. Blank lines and other fields (`id:`, `retry:`, comments) are
//! skipped; records are not assembled across blank lines.
//!
//! Chunks may split lines and multi-byte UTF-8 characters anywhere.

mod frame;

pub use frame::{DEFAULT_EVENT, ENDPOINT_EVENT, Frame};

use tracing::warn;

/// Buffered frame decoder that handles partial chunks
#[derive(Debug)]
pub struct FrameDecoder {
    /// Text of the last incomplete line
    buffer: String,
    /// Bytes of a UTF-8 sequence cut by the chunk boundary
    incomplete_utf8: Vec<u8>,
    /// Event name applied to the next data line
    current_event: String,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            incomplete_utf8: Vec::new(),
            current_event: DEFAULT_EVENT.to_string(),
        }
    }

    /// Feed raw bytes into the decoder and return the frames they complete,
    /// in stream order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_utf8(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let complete: String = self.buffer.drain(..=last_newline).collect();
        complete
            .split('\n')
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    /// Append `chunk` to the text buffer, holding back a trailing partial
    /// UTF-8 sequence for the next call
    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.incomplete_utf8);
        bytes.extend_from_slice(chunk);

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        // Sequence continues in the next chunk
                        None => {
                            self.incomplete_utf8 = after.to_vec();
                            return;
                        }
                        Some(len) => {
                            warn!("Invalid UTF-8 sequence of {} bytes in event stream", len);
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
    }

    /// Apply one complete line; returns a frame for `data:` lines
    fn process_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() {
            return None;
        }

        if let Some(value) = line.strip_prefix("event:") {
            self.current_event = value.trim().to_string();
            None
        } else if let Some(value) = line.strip_prefix("data:") {
            let event = std::mem::replace(&mut self.current_event, DEFAULT_EVENT.to_string());
            Some(Frame {
                event,
                data: value.trim().to_string(),
            })
        } else {
            None
        }
    }

    /// Clear all buffered state
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.incomplete_utf8.clear();
        self.current_event = DEFAULT_EVENT.to_string();
    }

    /// Check if there's an incomplete line or character buffered
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty() || !self.incomplete_utf8.is_empty()
    }

    /// Get the buffered incomplete line (for debugging)
    pub fn remaining(&self) -> &str {
        &self.buffer
    }
}
