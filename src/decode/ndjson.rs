//! Newline-delimited JSON framing (local inference server)

use super::Frame;
use crate::api::LocalChatChunk;

/// Decode one NDJSON line into a frame.
///
/// The local stream has no sentinel line; it ends when the transport closes.
/// Malformed JSON is skipped rather than treated as fatal.
pub fn decode_ndjson_line(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Skip;
    }

    match serde_json::from_str::<LocalChatChunk>(line) {
        Ok(chunk) => match chunk.content() {
            Some(text) if !text.is_empty() => Frame::Fragment(text.to_string()),
            _ => Frame::Skip,
        },
        Err(e) => {
            tracing::trace!(error = %e, line = %line, "Skipping malformed NDJSON line");
            Frame::Skip
        }
    }
}
