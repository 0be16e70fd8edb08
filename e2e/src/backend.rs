//! Mock upstream that plays both providers
//!
//! `/api/chat` stands in for the local inference server (NDJSON) and
//! `/v1/chat/completions` for the hosted API (SSE). Tests queue replies via
//! SharedBackendState before each request.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use futures::StreamExt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::types::{BackendState, MockResponse, ReceivedRequest, SharedBackendState};

const LOCAL_CHAT_PATH: &str = "/api/chat";
const CLOUD_CHAT_PATH: &str = "/v1/chat/completions";
const DEFAULT_REPLY: &str = "Default response (no mock queued)";

/// Default model list returned by /api/tags
fn default_tags_response() -> &'static str {
    r#"{"models":[{"name":"llama3.2:latest","size":2019393189}]}"#
}

/// Default model list returned by /v1/models
fn default_models_response() -> &'static str {
    r#"{"object":"list","data":[{"id":"llama-3.3-70b-versatile","object":"model","owned_by":"mock"}]}"#
}

/// Record the call and pop the next queued reply
fn take_reply(
    state: &SharedBackendState,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
    fallback: fn() -> MockResponse,
) -> MockResponse {
    let received = ReceivedRequest {
        path: path.to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };

    let mut state = state.lock().unwrap();
    state.received_requests.push(received);
    state.response_queue.pop_front().unwrap_or_else(fallback)
}

/// Turn a mock reply into a chunked HTTP response, pausing between chunks
fn stream_reply(reply: MockResponse) -> Response {
    let delay = Duration::from_millis(reply.chunk_delay_ms);
    let chunks = futures::stream::iter(reply.chunks.into_iter().enumerate()).then(
        move |(i, chunk)| async move {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, std::io::Error>(Bytes::from(chunk))
        },
    );

    Response::builder()
        .status(reply.status)
        .header(header::CONTENT_TYPE, reply.content_type)
        .body(Body::from_stream(chunks))
        .unwrap()
}

/// Handle POST /api/chat
async fn handle_local_chat(
    State(state): State<SharedBackendState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = take_reply(&state, LOCAL_CHAT_PATH, &headers, body, || {
        MockResponse::ndjson(&[DEFAULT_REPLY])
    });
    stream_reply(reply)
}

/// Handle POST /v1/chat/completions
async fn handle_cloud_chat(
    State(state): State<SharedBackendState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = take_reply(&state, CLOUD_CHAT_PATH, &headers, body, || {
        MockResponse::sse(&[DEFAULT_REPLY])
    });
    stream_reply(reply)
}

/// Handle GET /api/tags
async fn handle_tags() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        default_tags_response(),
    )
}

/// Handle GET /v1/models
async fn handle_models() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        default_models_response(),
    )
}

/// Start the mock upstream and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state: SharedBackendState = std::sync::Arc::new(std::sync::Mutex::new(BackendState::default()));

    let app = Router::new()
        .route(LOCAL_CHAT_PATH, post(handle_local_chat))
        .route(CLOUD_CHAT_PATH, post(handle_cloud_chat))
        .route("/api/tags", get(handle_tags))
        .route("/v1/models", get(handle_models))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock backend to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(state)
}

/// Queue the next chat reply
pub fn queue_response(state: &SharedBackendState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Take every chat call received since the last drain
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}
