//! Frame decoding for upstream streaming protocols
//!
//! Upstream bodies arrive as arbitrary byte chunks. [`LineBuffer`] reassembles
//! them into complete lines, and a [`Framing`] turns each line into a
//! [`Frame`]. Lines that fail to parse are skipped; one bad line
//! from an upstream must never end an otherwise healthy stream.

mod line_buffer;
mod ndjson;
mod sse;

pub use line_buffer::LineBuffer;
pub use ndjson::decode_ndjson_line;
pub use sse::{decode_sse_line, SSE_DONE_LINE};

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-empty piece of generated text
    Fragment(String),
    /// Nothing to emit (blank, malformed, or content-free line)
    Skip,
    /// End-of-stream sentinel; later lines must be ignored
    End,
}

/// Framing convention used by an upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON object per line (local inference server)
    Ndjson,
    /// `data: ` prefixed Server-Sent-Events lines (cloud API)
    Sse,
}

impl Framing {
    pub fn decode_line(self, line: &str) -> Frame {
        match self {
            Framing::Ndjson => decode_ndjson_line(line),
            Framing::Sse => decode_sse_line(line),
        }
    }
}

/// Decode a complete body at once. Used by tests and diagnostics; providers
/// decode incrementally through [`LineBuffer`].
pub fn decode_all(framing: Framing, body: &[u8]) -> Vec<String> {
    let mut buffer = LineBuffer::new();
    let mut lines = buffer.push(body);
    lines.extend(buffer.finish());

    let mut fragments = Vec::new();
    for line in lines {
        match framing.decode_line(&line) {
            Frame::Fragment(text) => fragments.push(text),
            Frame::Skip => {}
            Frame::End => break,
        }
    }
    fragments
}
