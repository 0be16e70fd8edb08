//! Server-Sent-Events framing (cloud provider)

use super::Frame;
use crate::api::StreamChunk;

/// Literal line that terminates a cloud stream
pub const SSE_DONE_LINE: &str = "data: [DONE]";

const DATA_PREFIX: &str = "data: ";

/// Decode one SSE line into a frame.
///
/// Only `data: ` lines carry payloads; `event:`, `id:`, comments and blank
/// separators are skipped, as are payloads that fail to parse.
pub fn decode_sse_line(line: &str) -> Frame {
    let line = line.trim();
    if line == SSE_DONE_LINE {
        return Frame::End;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.content() {
            Some(text) if !text.is_empty() => Frame::Fragment(text.to_string()),
            _ => Frame::Skip,
        },
        Err(e) => {
            tracing::trace!(error = %e, payload = %payload, "Skipping malformed SSE payload");
            Frame::Skip
        }
    }
}
