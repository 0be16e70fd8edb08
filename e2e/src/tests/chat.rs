//! /chat streaming, routing and history behavior

use serde_json::json;

use super::helpers::*;
use crate::backend::{drain_requests, queue_response};
use crate::client::{send_chat, send_raw_chat};
use crate::runner::TestContext;
use crate::types::MockResponse;

/// Local model: fragments arrive in order as plain text
pub async fn test_local_streaming(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["Hola", " ¿", "qué", " tal?"]));

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat("e2e-local", "Hola")).await?;

    assert_true(reply.status == 200, &format!("Expected 200, got {}", reply.status))?;
    assert_true(
        reply.content_type.starts_with("text/plain"),
        &format!("Expected text/plain, got {}", reply.content_type),
    )?;
    assert_eq_str(&reply.text, "Hola ¿qué tal?", "relay reply")?;

    let upstream = single_request(drain_requests(&ctx.backend_state))?;
    assert_eq_str(&upstream.path, "/api/chat", "upstream path")?;
    assert_true(upstream.body["stream"] == json!(true), "Local call must request streaming")?;
    assert_eq_str(upstream.body["model"].as_str().unwrap_or_default(), "llama3.2", "upstream model")?;

    let messages = roles_and_contents(&upstream.messages());
    assert_true(
        messages.len() == 2,
        &format!("Expected system + user, got {:?}", messages),
    )?;
    assert_eq_str(&messages[0].0, "system", "first role")?;
    assert_eq_str(&messages[0].1, "You are a test assistant.", "system prompt")?;
    assert_eq_str(&messages[1].1, "Hola", "user message")?;
    Ok(())
}

/// First chunk reaches the client before the upstream finishes
pub async fn test_incremental_delivery(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(
        &ctx.backend_state,
        MockResponse::ndjson(&["one", " two", " three"]).with_delay(400),
    );

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat("e2e-incremental", "Count")).await?;

    assert_eq_str(&reply.text, "one two three", "relay reply")?;
    let first = reply
        .first_chunk_ms
        .ok_or_else(|| anyhow::anyhow!("No body chunk received"))?;
    assert_true(
        reply.total_ms >= 1000 && first + 600 < reply.total_ms,
        &format!(
            "First chunk at {}ms should precede the end ({}ms) by the upstream delays",
            first, reply.total_ms
        ),
    )
}

/// Completed exchanges become history for the next turn
pub async fn test_history_committed(ctx: TestContext) -> anyhow::Result<()> {
    let conv = "e2e-history";
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["Hi", " there"]));
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["Lentils"]));

    send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Hello")).await?;
    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Dinner idea?")).await?;
    assert_eq_str(&reply.text, "Lentils", "second reply")?;

    let requests = drain_requests(&ctx.backend_state);
    assert_true(requests.len() == 2, &format!("Expected 2 upstream calls, got {}", requests.len()))?;

    let messages = roles_and_contents(&requests[1].messages());
    let expected = vec![
        ("system".to_string(), "You are a test assistant.".to_string()),
        ("user".to_string(), "Hello".to_string()),
        ("assistant".to_string(), "Hi there".to_string()),
        ("user".to_string(), "Dinner idea?".to_string()),
    ];
    assert_true(
        messages == expected,
        &format!("Second call should carry the first exchange, got {:?}", messages),
    )
}

/// Lines that aren't valid JSON are dropped, the rest still streams
pub async fn test_malformed_lines_skipped(ctx: TestContext) -> anyhow::Result<()> {
    let response = MockResponse::raw(
        200,
        "application/x-ndjson",
        vec![
            "{\"message\":{\"content\":\"Good\"}}\n".to_string(),
            "this is not json\n".to_string(),
            "{\"message\":{\"content\":\" bye\"},\"done\":true}\n".to_string(),
        ],
    );
    queue_response(&ctx.backend_state, response);

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat("e2e-malformed", "Hi")).await?;
    assert_eq_str(&reply.text, "Good bye", "relay reply")
}

/// Cloud model: SSE deltas relayed, request key sent as bearer token
pub async fn test_cloud_streaming(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::sse(&["Hello", " from", " the cloud"]));

    let reply = send_chat(
        &ctx.http_client,
        &ctx.relay_addr,
        cloud_chat("e2e-cloud", "Hi", Some("sk-e2e-test")),
    )
    .await?;
    assert_eq_str(&reply.text, "Hello from the cloud", "relay reply")?;

    let upstream = single_request(drain_requests(&ctx.backend_state))?;
    assert_eq_str(&upstream.path, "/v1/chat/completions", "upstream path")?;
    assert_eq_str(
        upstream.authorization.as_deref().unwrap_or_default(),
        "Bearer sk-e2e-test",
        "authorization header",
    )?;
    assert_true(upstream.body["stream"] == json!(true), "Cloud call must request streaming")?;
    assert_eq_str(
        upstream.body["model"].as_str().unwrap_or_default(),
        "llama-3.3-70b-versatile",
        "upstream model",
    )
}

/// No key anywhere: one error fragment, nothing sent upstream, nothing recorded
pub async fn test_cloud_missing_key(ctx: TestContext) -> anyhow::Result<()> {
    let conv = "e2e-missing-key";
    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, cloud_chat(conv, "Hi", None)).await?;

    assert_true(reply.status == 200, &format!("Expected 200, got {}", reply.status))?;
    assert_true(
        reply.text.contains("Missing API key") && reply.text.contains(CLOUD_PROVIDER),
        &format!("Unexpected reply: {:?}", reply.text),
    )?;
    assert_true(
        drain_requests(&ctx.backend_state).is_empty(),
        "No upstream call should be made without a key",
    )?;

    assert_history_empty(&ctx, conv).await
}

/// Upstream 429: the body reaches the client and history stays unchanged
pub async fn test_cloud_rate_limited(ctx: TestContext) -> anyhow::Result<()> {
    let conv = "e2e-rate-limited";
    queue_response(
        &ctx.backend_state,
        MockResponse::error(429, json!({"error": {"message": "Rate limit reached"}})),
    );

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, cloud_chat(conv, "Hi", Some("sk-e2e"))).await?;
    assert_true(
        reply.text.contains("429") && reply.text.contains("Rate limit reached"),
        &format!("Reply should carry the upstream error, got {:?}", reply.text),
    )?;
    drain_requests(&ctx.backend_state);

    assert_history_empty(&ctx, conv).await
}

/// Provider names other than the configured cloud one are refused in-band
pub async fn test_unsupported_provider(ctx: TestContext) -> anyhow::Result<()> {
    let mut body = cloud_chat("e2e-unsupported", "Hi", Some("sk-e2e"));
    body["model"]["provider"] = json!("Elsewhere AI");

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, body).await?;
    assert_true(reply.status == 200, &format!("Expected 200, got {}", reply.status))?;
    assert_true(
        reply.text.contains("Unsupported provider"),
        &format!("Unexpected reply: {:?}", reply.text),
    )?;
    assert_true(
        drain_requests(&ctx.backend_state).is_empty(),
        "Unsupported provider must not reach any upstream",
    )
}

/// Document text is folded into the user turn
pub async fn test_document_context(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["Go for the lentils"]));

    let mut body = local_chat("e2e-document", "What is healthiest?");
    body["documentContext"] = json!("Menu: lentil soup, fried chicken");
    send_chat(&ctx.http_client, &ctx.relay_addr, body).await?;

    let upstream = single_request(drain_requests(&ctx.backend_state))?;
    let messages = roles_and_contents(&upstream.messages());
    let user = messages
        .last()
        .map(|(_, content)| content.clone())
        .unwrap_or_default();
    assert_eq_str(
        &user,
        "Document context:\nMenu: lentil soup, fried chicken\n\nUser question: What is healthiest?",
        "user turn",
    )
}

/// Upstream goes quiet mid-reply: partial text plus an error, nothing recorded
pub async fn test_stall_not_committed(ctx: TestContext) -> anyhow::Result<()> {
    let conv = "e2e-stall";
    // Relay idle timeout in the test config is 2s
    queue_response(
        &ctx.backend_state,
        MockResponse::ndjson(&["Partial", " never"]).with_delay(3500),
    );

    let reply = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Hi")).await?;
    assert_true(
        reply.text.starts_with("Partial") && reply.text.contains("no response from"),
        &format!("Expected partial text then a timeout notice, got {:?}", reply.text),
    )?;
    drain_requests(&ctx.backend_state);

    assert_history_empty(&ctx, conv).await
}

/// Two overlapping requests on one conversation both land in history
pub async fn test_concurrent_same_conversation(ctx: TestContext) -> anyhow::Result<()> {
    let conv = "e2e-concurrent";
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["first", " answer"]).with_delay(300));
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["second", " answer"]).with_delay(300));

    let a = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Question one"));
    let b = send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Question two"));
    let (a, b) = tokio::join!(a, b);
    a?;
    b?;
    drain_requests(&ctx.backend_state);

    queue_response(&ctx.backend_state, MockResponse::ndjson(&["third"]));
    send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Question three")).await?;

    let upstream = single_request(drain_requests(&ctx.backend_state))?;
    let roles = roles(&upstream.messages());
    let expected = ["system", "user", "assistant", "user", "assistant", "user"];
    assert_true(
        roles == expected,
        &format!("Both exchanges should be recorded whole, got {:?}", roles),
    )
}

/// Body missing required fields is rejected before streaming
pub async fn test_missing_field_rejected(ctx: TestContext) -> anyhow::Result<()> {
    let response = send_raw_chat(
        &ctx.http_client,
        &ctx.relay_addr,
        r#"{"model":{"id":"llama3.2","type":"local"}}"#,
    )
    .await?;
    assert_true(
        response.status == 422,
        &format!("Expected 422, got {}", response.status),
    )?;
    assert_true(
        response.body["detail"].is_string(),
        &format!("Expected a detail message, got {}", response.body),
    )?;
    assert_true(
        drain_requests(&ctx.backend_state).is_empty(),
        "Rejected requests must not reach any upstream",
    )
}

/// A follow-up turn on `conv` shows no earlier exchange upstream
async fn assert_history_empty(ctx: &TestContext, conv: &str) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::ndjson(&["ok"]));
    send_chat(&ctx.http_client, &ctx.relay_addr, local_chat(conv, "Still there?")).await?;

    let upstream = single_request(drain_requests(&ctx.backend_state))?;
    let roles = roles(&upstream.messages());
    assert_true(
        roles == ["system", "user"],
        &format!("Nothing should have been recorded for {}, got {:?}", conv, roles),
    )
}
