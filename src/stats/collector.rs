//! Per-exchange metrics

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// How a streamed exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Drained normally with text; history committed
    Completed,
    /// Drained normally without any text
    Empty,
    /// Provider reported an error
    Failed,
    /// Caller went away mid-stream
    Cancelled,
    /// Idle or total deadline hit
    TimedOut,
    /// No provider matched the request
    Unsupported,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Empty => "empty",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
            Outcome::TimedOut => "timed_out",
            Outcome::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collected metrics from one relayed exchange
#[derive(Debug, Clone, Serialize)]
pub struct RelayMetrics {
    /// Unique request ID
    pub request_id: String,
    /// Timestamp of the request
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    /// Route taken ("local", "cloud", "unsupported")
    pub route: String,
    /// Upstream model identifier
    pub model: String,
    /// Stored messages sent along with the new turn
    pub history_len: usize,
    /// Fragments forwarded to the caller
    pub fragments: usize,
    /// Characters forwarded to the caller
    pub output_chars: usize,
    /// Time to first fragment in ms
    pub first_fragment_ms: Option<f64>,
    /// Exchange duration in ms
    pub duration_ms: f64,
    pub outcome: Outcome,
    /// Whether the exchange was written to history
    pub committed: bool,
}

impl RelayMetrics {
    pub fn new(conversation_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            conversation_id: conversation_id.into(),
            route: "unknown".to_string(),
            model: model.into(),
            history_len: 0,
            fragments: 0,
            output_chars: 0,
            first_fragment_ms: None,
            duration_ms: 0.0,
            outcome: Outcome::Empty,
            committed: false,
        }
    }

    /// Count one forwarded fragment
    pub fn record_fragment(&mut self, text: &str, start: Instant) {
        if self.first_fragment_ms.is_none() {
            self.first_fragment_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        }
        self.fragments += 1;
        self.output_chars += text.chars().count();
    }

    pub fn finish(&mut self, outcome: Outcome, committed: bool, start: Instant) {
        self.outcome = outcome;
        self.committed = committed;
        self.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    }
}
