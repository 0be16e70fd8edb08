use futures::StreamExt;

use super::{emit, EventSender, ProviderError, ProviderEvent};
use crate::decode::{Frame, Framing, LineBuffer};

/// Drive an upstream response body through the line decoder, forwarding
/// each text fragment as it is decoded. Stops at the end-of-stream marker
/// or when the body ends.
pub(crate) async fn pump_body(
    provider: &str,
    response: reqwest::Response,
    framing: Framing,
    events: &EventSender,
) -> Result<(), ProviderError> {
    let mut body = response.bytes_stream();
    let mut lines = LineBuffer::new();
    let mut fragments = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| ProviderError::Stream {
            provider: provider.to_string(),
            source,
        })?;
        tracing::trace!(provider, bytes = chunk.len(), "Upstream chunk");

        for line in lines.push(&chunk) {
            match framing.decode_line(&line) {
                Frame::Fragment(text) => {
                    fragments += 1;
                    emit(events, ProviderEvent::Fragment(text)).await?;
                }
                Frame::Skip => {}
                Frame::End => {
                    tracing::trace!(provider, fragments, "End-of-stream marker received");
                    return Ok(());
                }
            }
        }
    }

    if let Some(line) = lines.finish() {
        if let Frame::Fragment(text) = framing.decode_line(&line) {
            fragments += 1;
            emit(events, ProviderEvent::Fragment(text)).await?;
        }
    }

    tracing::trace!(provider, fragments, "Upstream body finished");
    Ok(())
}
