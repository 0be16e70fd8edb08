//! HTTP client that behaves like the browser frontend talking to the relay

use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Instant;

use crate::types::{ChatReply, RelayResponse};

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

/// POST /chat and read the plain-text stream to the end, timing the first chunk
pub async fn send_chat(
    client: &Client,
    relay_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<ChatReply> {
    let url = format!("http://{relay_addr}/chat");
    let start = Instant::now();

    let resp = client
        .post(&url)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send chat request to relay: {}", e))?;

    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();
    let mut first_chunk_ms = None;

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        if first_chunk_ms.is_none() && !chunk.is_empty() {
            first_chunk_ms = Some(start.elapsed().as_millis() as u64);
        }
        all_bytes.extend_from_slice(&chunk);
    }

    let text = String::from_utf8(all_bytes)
        .map_err(|e| anyhow::anyhow!("Relay reply is not valid UTF-8: {}", e))?;

    Ok(ChatReply {
        status,
        content_type,
        text,
        first_chunk_ms,
        total_ms: start.elapsed().as_millis() as u64,
    })
}

/// POST /chat with a raw body, for malformed-request checks
pub async fn send_raw_chat(client: &Client, relay_addr: &str, body: &str) -> anyhow::Result<RelayResponse> {
    let url = format!("http://{relay_addr}/chat");
    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send chat request to relay: {}", e))?;

    read_response(resp).await
}

/// Upload a file as multipart field `file`
pub async fn upload(
    client: &Client,
    relay_addr: &str,
    path: &str,
    filename: &str,
    content: Vec<u8>,
) -> anyhow::Result<RelayResponse> {
    let url = format!("http://{relay_addr}{path}");
    let form = Form::new().part("file", Part::bytes(content).file_name(filename.to_string()));

    let resp = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upload to {}: {}", url, e))?;

    read_response(resp).await
}

/// Send a GET request to the relay
pub async fn send_get(client: &Client, relay_addr: &str, path: &str) -> anyhow::Result<RelayResponse> {
    let url = format!("http://{relay_addr}{path}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", url, e))?;

    read_response(resp).await
}

async fn read_response(resp: reqwest::Response) -> anyhow::Result<RelayResponse> {
    let status = resp.status().as_u16();
    let body_text = resp.text().await.unwrap_or_default();
    let body: serde_json::Value =
        serde_json::from_str(&body_text).unwrap_or(serde_json::Value::String(body_text));

    Ok(RelayResponse { status, body })
}
