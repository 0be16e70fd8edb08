//! Local inference server (Ollama-style `/api/chat`) types

use serde::{Deserialize, Serialize};

use super::Message;

/// Streaming chat request sent to the local server
#[derive(Debug, Clone, Serialize)]
pub struct LocalChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
}

/// One newline-delimited JSON object of the local stream. The final object
/// carries `done` and timing fields; the stream ending is what counts here.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalChatChunk {
    #[serde(default)]
    pub message: Option<LocalChunkMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalChunkMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl LocalChatChunk {
    /// Text carried by this chunk, if any
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref()?.content.as_deref()
    }
}
