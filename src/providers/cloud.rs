use async_trait::async_trait;

use super::stream::pump_body;
use super::{finish, ChatProvider, EventSender, ProviderCall, ProviderError};
use crate::api::ChatCompletionRequest;
use crate::decode::Framing;

/// Hosted OpenAI-compatible API speaking Server-Sent Events
pub struct CloudProvider {
    client: reqwest::Client,
    name: String,
    chat_url: String,
    /// Server-side key, resolved once at startup
    default_api_key: Option<String>,
    /// Where the default key is expected to come from, for error messages
    api_key_env: String,
}

impl CloudProvider {
    pub fn new(
        client: reqwest::Client,
        name: impl Into<String>,
        chat_url: impl Into<String>,
        default_api_key: Option<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            chat_url: chat_url.into(),
            default_api_key,
            api_key_env: api_key_env.into(),
        }
    }

    /// Request key first, then the server default
    fn effective_key<'a>(&'a self, call: &'a ProviderCall) -> Option<&'a str> {
        call.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref())
    }

    async fn run(&self, call: &ProviderCall, events: &EventSender) -> Result<(), ProviderError> {
        let key = self
            .effective_key(call)
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: self.name.clone(),
                env: self.api_key_env.clone(),
            })?;

        let body = ChatCompletionRequest {
            model: &call.model,
            messages: &call.messages,
            stream: true,
        };

        tracing::debug!(url = %self.chat_url, model = %call.model, msgs = call.messages.len(), "Opening cloud stream");

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: self.name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status,
                body,
            });
        }

        pump_body(&self.name, response, Framing::Sse, events).await
    }
}

#[async_trait]
impl ChatProvider for CloudProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_chat(&self, call: ProviderCall, events: EventSender) {
        let result = self.run(&call, &events).await;
        finish(&self.name, result, &events).await;
    }
}
