use async_trait::async_trait;

use super::stream::pump_body;
use super::{finish, ChatProvider, EventSender, ProviderCall, ProviderError};
use crate::api::LocalChatRequest;
use crate::decode::Framing;

/// Local inference server speaking newline-delimited JSON
pub struct LocalProvider {
    client: reqwest::Client,
    chat_url: String,
}

impl LocalProvider {
    pub const NAME: &'static str = "local model";

    pub fn new(client: reqwest::Client, chat_url: impl Into<String>) -> Self {
        Self {
            client,
            chat_url: chat_url.into(),
        }
    }

    async fn run(&self, call: &ProviderCall, events: &EventSender) -> Result<(), ProviderError> {
        let body = LocalChatRequest {
            model: &call.model,
            messages: &call.messages,
            stream: true,
        };

        tracing::debug!(url = %self.chat_url, model = %call.model, msgs = call.messages.len(), "Opening local stream");

        let response = self
            .client
            .post(&self.chat_url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| ProviderError::Transport {
                provider: Self::NAME.to_string(),
                source,
            })?;

        pump_body(Self::NAME, response, Framing::Ndjson, events).await
    }
}

#[async_trait]
impl ChatProvider for LocalProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn stream_chat(&self, call: ProviderCall, events: EventSender) {
        let result = self.run(&call, &events).await;
        finish(Self::NAME, result, &events).await;
    }
}
