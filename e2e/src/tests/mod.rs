//! Test registry - all test cases are registered here

pub mod chat;
pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Chat tests:
/// 1. Queue a mock upstream reply (what the provider would stream)
/// 2. Send a request to the REAL relay
/// 3. Validate the plain-text reply and what reached the upstream
///
/// The relay keeps history across tests, so each test uses its own conversation id.
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Local provider ────────────────────────────────────────────────────
        test!(
            "local/streaming",
            "NDJSON fragments are relayed in order as plain text",
            chat::test_local_streaming
        ),
        test!(
            "local/incremental_delivery",
            "First fragment reaches the client before the upstream finishes",
            chat::test_incremental_delivery
        ),
        test!(
            "local/malformed_lines_skipped",
            "Non-JSON lines are dropped without ending the stream",
            chat::test_malformed_lines_skipped
        ),
        test!(
            "local/document_context",
            "Document text is folded into the user turn",
            chat::test_document_context
        ),

        // ── Cloud provider ────────────────────────────────────────────────────
        test!(
            "cloud/streaming",
            "SSE deltas are relayed; request key is sent as bearer token",
            chat::test_cloud_streaming
        ),
        test!(
            "cloud/missing_key",
            "Missing key yields one error fragment and no upstream call",
            chat::test_cloud_missing_key
        ),
        test!(
            "cloud/rate_limited",
            "Upstream 429 body is relayed and nothing is recorded",
            chat::test_cloud_rate_limited
        ),
        test!(
            "chat/unsupported_provider",
            "Unknown provider name is refused in-band with status 200",
            chat::test_unsupported_provider
        ),
        test!(
            "chat/missing_field",
            "Request without a message is rejected with 422",
            chat::test_missing_field_rejected
        ),

        // ── History ───────────────────────────────────────────────────────────
        test!(
            "history/committed",
            "Completed exchange is sent as context on the next turn",
            chat::test_history_committed
        ),
        test!(
            "history/stall_not_committed",
            "Idle timeout relays partial text plus an error and records nothing",
            chat::test_stall_not_committed
        ),
        test!(
            "history/concurrent_same_conversation",
            "Overlapping requests on one conversation are both recorded whole",
            chat::test_concurrent_same_conversation
        ),

        // ── Documents ─────────────────────────────────────────────────────────
        test!(
            "documents/text_preview",
            "Text upload returns full text and a 500-char preview",
            documents::test_text_upload_preview
        ),
        test!(
            "documents/short_markdown",
            "Short markdown upload is previewed whole",
            documents::test_short_markdown_upload
        ),
        test!(
            "documents/unsupported_extension",
            "Unknown file types are rejected with 400",
            documents::test_unsupported_extension
        ),
        test!(
            "documents/empty",
            "Whitespace-only documents are rejected with 400",
            documents::test_empty_document
        ),
        test!("health", "/health answers OK", documents::test_health),
    ]
}
