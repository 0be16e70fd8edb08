use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;

use super::error::ApiError;
use super::router::RelayState;
use crate::api::ChatRequest;
use crate::documents::DocumentUpload;

/// Multipart field carrying the uploaded document
const FILE_FIELD: &str = "file";

/// Health check endpoint
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Stream the reply to one chat message as plain text
pub async fn chat_handler(
    State(state): State<RelayState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let fragments = state.relay.start(request).into_stream();
    let body = Body::from_stream(fragments.map(|f| Ok::<_, Infallible>(Bytes::from(f))));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Extract text from an uploaded document
pub async fn upload_handler(
    State(state): State<RelayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentUpload>, ApiError> {
    let mut multipart = multipart?;
    let max_bytes = state.config.documents.max_upload_bytes;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        // Reject unknown types before reading the body
        state.extractors.for_filename(&filename).map_err(|_| {
            ApiError::bad_request(format!(
                "Unsupported file type for '{}'. Allowed: {}",
                filename,
                state.extractors.supported().join(", ")
            ))
        })?;

        let bytes = field.bytes().await?;
        if bytes.len() > max_bytes {
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File exceeds the {} byte upload limit", max_bytes),
            ));
        }

        let extractors = state.extractors.clone();
        let name = filename.clone();
        let text = tokio::task::spawn_blocking(move || extractors.extract(&name, &bytes))
            .await
            .map_err(|e| ApiError::internal(format!("Text extraction aborted: {}", e)))??;

        tracing::info!(filename = %filename, chars = text.chars().count(), "Document text extracted");
        return Ok(Json(DocumentUpload::new(
            filename,
            text,
            state.config.documents.preview_chars,
        )));
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
