//! Shared types for the e2e test harness

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A canned reply the mock upstream streams back to the relay
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    /// Body pieces, flushed one by one
    pub chunks: Vec<String>,
    /// Pause before every chunk after the first
    pub chunk_delay_ms: u64,
}

impl MockResponse {
    /// Local-server style NDJSON stream, one line per chunk
    pub fn ndjson(fragments: &[&str]) -> Self {
        let chunks = fragments
            .iter()
            .map(|text| {
                format!(
                    "{}\n",
                    serde_json::json!({"message": {"role": "assistant", "content": text}, "done": false})
                )
            })
            .chain(std::iter::once(format!(
                "{}\n",
                serde_json::json!({"message": {"role": "assistant", "content": ""}, "done": true})
            )))
            .collect();
        Self::raw(200, "application/x-ndjson", chunks)
    }

    /// Hosted-API style SSE stream terminated by `[DONE]`
    pub fn sse(fragments: &[&str]) -> Self {
        let chunks = fragments
            .iter()
            .map(|text| {
                format!(
                    "data: {}\n\n",
                    serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
                )
            })
            .chain(std::iter::once("data: [DONE]\n\n".to_string()))
            .collect();
        Self::raw(200, "text/event-stream", chunks)
    }

    /// Non-success status with a JSON body
    pub fn error(status: u16, body: Value) -> Self {
        Self::raw(status, "application/json", vec![body.to_string()])
    }

    /// Arbitrary body pieces
    pub fn raw(status: u16, content_type: &str, chunks: Vec<String>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            chunks,
            chunk_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, chunk_delay_ms: u64) -> Self {
        self.chunk_delay_ms = chunk_delay_ms;
        self
    }
}

/// State shared between the mock upstream and the tests
#[derive(Debug, Default)]
pub struct BackendState {
    /// Replies served in FIFO order to chat calls on either endpoint
    pub response_queue: VecDeque<MockResponse>,
    /// Chat calls the relay made, in arrival order
    pub received_requests: Vec<ReceivedRequest>,
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// One chat call the relay forwarded upstream
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

impl ReceivedRequest {
    /// `messages` array of the forwarded body
    pub fn messages(&self) -> Vec<Value> {
        self.body["messages"].as_array().cloned().unwrap_or_default()
    }
}

/// What the relay answered on `/chat`
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub status: u16,
    pub content_type: String,
    pub text: String,
    /// Milliseconds until the first body chunk arrived
    pub first_chunk_ms: Option<u64>,
    pub total_ms: u64,
}

/// Non-streaming relay response, JSON when it parses, string otherwise
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: u16,
    pub body: Value,
}

/// JSON returned by the upload endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub text: String,
    pub preview: String,
}

/// Outcome of a single test
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
