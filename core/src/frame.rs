//! Incremental decoder for the newline-delimited data stream.
//!
//! Every line is `<tag>:<payload>`. Tag `0` carries a text delta whose payload is one JSON
//! string literal; every other tag is metadata that the transcript does not use.

use crate::errors::{ChatError, ChatResult};

pub const TEXT_DELTA_TAG: &str = "0";
pub const ERROR_TAG: &str = "3";

const PREVIEW_LEN: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    TextDelta(String),
    Other { tag: String, payload: String },
}

/// Splits arbitrary byte chunks into complete frames.
///
/// Bytes after the last newline are kept until the next chunk, so lines and multi-byte
/// characters may be cut anywhere by the transport. Frames are pulled one at a time, so a
/// malformed line only fails once every frame before it has been handed out.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    // Prefix of `pending` already known to hold no newline
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one chunk from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Returns the next complete frame, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> ChatResult<Option<Frame>> {
        loop {
            let Some(offset) = self.pending[self.scanned..]
                .iter()
                .position(|byte| *byte == b'\n')
            else {
                self.scanned = self.pending.len();
                return Ok(None);
            };

            let newline = self.scanned + offset;
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.scanned = 0;
            if let Some(frame) = parse_line(&line[..newline])? {
                return Ok(Some(frame));
            }
        }
    }

    /// Parses a final line left without a trailing newline.
    pub fn finish(&mut self) -> ChatResult<Option<Frame>> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return Ok(None);
        }
        let line = std::mem::take(&mut self.pending);
        parse_line(&line)
    }
}

/// Classifies one line. Blank lines yield `None`.
pub fn parse_line(line: &[u8]) -> ChatResult<Option<Frame>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| ChatError::Protocol(format!("frame is not valid UTF-8: {}", e)))?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (tag, payload) = line.split_once(':').ok_or_else(|| {
        ChatError::Protocol(format!("frame has no tag separator: {}", preview(line)))
    })?;
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ChatError::Protocol(format!(
            "invalid frame tag '{}': {}",
            tag,
            preview(line)
        )));
    }

    if tag == TEXT_DELTA_TAG {
        let text: String = serde_json::from_str(payload).map_err(|e| {
            ChatError::Protocol(format!(
                "text delta payload is not a JSON string ({}): {}",
                e,
                preview(payload)
            ))
        })?;
        return Ok(Some(Frame::TextDelta(text)));
    }

    Ok(Some(Frame::Other {
        tag: tag.to_string(),
        payload: payload.to_string(),
    }))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
