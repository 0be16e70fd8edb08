//! Common test helpers and request builders

use serde_json::{json, Value};

use crate::types::ReceivedRequest;

/// Cloud provider name configured in test_configs/relay.yaml
pub const CLOUD_PROVIDER: &str = "Groq Cloud";

// ─── Request builders ────────────────────────────────────────────────────────

/// Chat request routed to the local model
pub fn local_chat(conversation_id: &str, message: &str) -> Value {
    json!({
        "message": message,
        "model": {"id": "llama3.2", "name": "Llama 3.2", "type": "local", "provider": "Ollama"},
        "conversation_id": conversation_id
    })
}

/// Chat request routed to the hosted API, optionally carrying its own key
pub fn cloud_chat(conversation_id: &str, message: &str, api_key: Option<&str>) -> Value {
    let mut body = json!({
        "message": message,
        "model": {
            "id": "llama-3.3-70b-versatile",
            "name": "Llama 3.3 70B",
            "type": "cloud",
            "provider": CLOUD_PROVIDER
        },
        "conversation_id": conversation_id
    });
    if let Some(key) = api_key {
        body["apiKey"] = Value::String(key.to_string());
    }
    body
}

// ─── Upstream inspection ─────────────────────────────────────────────────────

/// Exactly one upstream call was made; return it
pub fn single_request(requests: Vec<ReceivedRequest>) -> anyhow::Result<ReceivedRequest> {
    match <[ReceivedRequest; 1]>::try_from(requests) {
        Ok([request]) => Ok(request),
        Err(requests) => Err(anyhow::anyhow!(
            "Expected exactly 1 upstream call, got {}",
            requests.len()
        )),
    }
}

/// `(role, content)` pairs of a forwarded message list
pub fn roles_and_contents(messages: &[Value]) -> Vec<(String, String)> {
    messages
        .iter()
        .map(|m| {
            (
                m["role"].as_str().unwrap_or_default().to_string(),
                m["content"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

/// Roles of a forwarded message list, in order
pub fn roles(messages: &[Value]) -> Vec<String> {
    roles_and_contents(messages).into_iter().map(|(role, _)| role).collect()
}

// ─── Assertions ──────────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}
