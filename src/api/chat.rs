//! Inbound `/chat` request types

use serde::{Deserialize, Serialize};

/// Conversation used when the caller doesn't name one
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Backend family a model runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum ModelKind {
    Local,
    Cloud,
}

// Anything that isn't "local" is a hosted model
impl From<String> for ModelKind {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("local") {
            ModelKind::Local
        } else {
            ModelKind::Cloud
        }
    }
}

/// Which backend and which upstream model to use for one request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSelector {
    /// Upstream model identifier (e.g. "llama3.2", "llama-3.3-70b-versatile")
    pub id: String,
    /// Human-readable name, only used for logging
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModelKind,
    #[serde(default)]
    pub provider: String,
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(rename = "message")]
    pub user_text: String,
    pub model: ModelSelector,
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
    #[serde(rename = "documentContext", alias = "pdfContext", default)]
    pub document_context: Option<String>,
    #[serde(rename = "conversation_id", alias = "conversationId", default)]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Conversation this request belongs to, falling back to the shared default
    pub fn conversation_id(&self) -> &str {
        match self.conversation_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => DEFAULT_CONVERSATION_ID,
        }
    }

    /// Request-supplied API key; an empty string means none was sent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Document text to prepend, if any
    pub fn document_context(&self) -> Option<&str> {
        self.document_context.as_deref().filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontend_payload() {
        let req: ChatRequest = serde_json::from_str(
            r#"{
                "message": "Hola",
                "model": {"id": "llama3.2", "name": "Llama 3.2", "type": "local", "provider": "Ollama"},
                "apiKey": "",
                "pdfContext": null,
                "conversation_id": "abc"
            }"#,
        )
        .unwrap();

        assert_eq!(req.user_text, "Hola");
        assert_eq!(req.model.kind, ModelKind::Local);
        assert_eq!(req.api_key(), None);
        assert_eq!(req.document_context(), None);
        assert_eq!(req.conversation_id(), "abc");
    }

    #[test]
    fn test_conversation_id_defaults() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "model": {"id": "m", "type": "cloud", "provider": "Groq Cloud"}}"#,
        )
        .unwrap();
        assert_eq!(req.conversation_id(), DEFAULT_CONVERSATION_ID);

        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "model": {"id": "m", "type": "cloud"}, "conversationId": ""}"#,
        )
        .unwrap();
        assert_eq!(req.conversation_id(), DEFAULT_CONVERSATION_ID);
    }

    #[test]
    fn test_unknown_model_type_is_cloud() {
        let model: ModelSelector =
            serde_json::from_str(r#"{"id": "m", "type": "api", "provider": "Groq Cloud"}"#).unwrap();
        assert_eq!(model.kind, ModelKind::Cloud);

        let model: ModelSelector = serde_json::from_str(r#"{"id": "m", "type": "LOCAL"}"#).unwrap();
        assert_eq!(model.kind, ModelKind::Local);
    }

    #[test]
    fn test_document_context_alias() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "q", "model": {"id": "m", "type": "local"}, "documentContext": "doc", "apiKey": "k"}"#,
        )
        .unwrap();
        assert_eq!(req.document_context(), Some("doc"));
        assert_eq!(req.api_key(), Some("k"));
    }
}
