//! Request logging formatter

use crate::api::ChatRequest;

/// Format a `/chat` request log message in compact format
pub fn format_chat_request(request: &ChatRequest, route: &str, history_len: usize) -> String {
    let mut parts = vec![
        format!("conv={}", request.conversation_id()),
        format!("model={}", request.model.id),
        format!("route={}", route),
        format!("msgs={}", history_len + 2),
    ];

    if request.api_key().is_some() {
        parts.push("key".to_string());
    }

    if let Some(ctx) = request.document_context() {
        parts.push(format!("doc={}", ctx.chars().count()));
    }

    let normalized = normalize_whitespace(&request.user_text);
    if !normalized.is_empty() {
        parts.push(format!("\"{}\"", truncate_message(&normalized)));
    }

    format!("→ {}", parts.join(" "))
}

/// Convert newlines and tabs to single spaces, collapse multiple spaces
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate message according to rules:
/// - If <= 100 chars: show all
/// - If > 100 chars: first 25 + " ... " + last 75
fn truncate_message(s: &str) -> String {
    const MAX_TOTAL: usize = 100;
    const PREFIX_LEN: usize = 25;
    const SUFFIX_LEN: usize = 75;
    const ELLIPSIS: &str = " ... ";

    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= MAX_TOTAL {
        return s.to_string();
    }

    let prefix: String = chars[..PREFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - SUFFIX_LEN..].iter().collect();

    format!("{}{}{}", prefix, ELLIPSIS, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> ChatRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_format_chat_request_basic() {
        let req = request(
            r#"{"message": "Hello\nthere", "model": {"id": "llama3.2", "type": "local", "provider": "Ollama"}}"#,
        );

        let log = format_chat_request(&req, "local", 2);
        assert!(log.starts_with("→ "));
        assert!(log.contains("conv=default"));
        assert!(log.contains("model=llama3.2"));
        assert!(log.contains("route=local"));
        assert!(log.contains("msgs=4"));
        assert!(log.contains("\"Hello there\""));
        assert!(!log.contains("key"));
    }

    #[test]
    fn test_format_chat_request_with_key_and_doc() {
        let req = request(
            r#"{"message": "Q", "model": {"id": "m", "type": "cloud", "provider": "Groq Cloud"},
                "apiKey": "sk-1", "documentContext": "abc", "conversation_id": "c9"}"#,
        );

        let log = format_chat_request(&req, "cloud", 0);
        assert!(log.contains("conv=c9"));
        assert!(log.contains(" key"));
        assert!(log.contains("doc=3"));
        assert!(!log.contains("sk-1"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("hello\nworld"), "hello world");
        assert_eq!(normalize_whitespace("hello\t\tworld"), "hello world");
        assert_eq!(normalize_whitespace("hello\r\nworld"), "hello world");
        assert_eq!(normalize_whitespace("hello   world"), "hello world");
    }

    #[test]
    fn test_truncate_message_short() {
        let msg = "This is a short message";
        assert_eq!(truncate_message(msg), msg);
    }

    #[test]
    fn test_truncate_message_long() {
        let msg = "x".repeat(300);
        let truncated = truncate_message(&msg);
        assert!(truncated.starts_with(&"x".repeat(25)));
        assert!(truncated.contains(" ... "));
        assert!(truncated.ends_with(&"x".repeat(75)));
    }

    #[test]
    fn test_truncate_message_multibyte() {
        let msg = "á".repeat(150);
        let truncated = truncate_message(&msg);
        assert_eq!(truncated.chars().count(), 105);
    }
}
