//! Upstream chat providers
//!
//! Each provider opens one streaming request and reports what it sees as
//! [`ProviderEvent`]s on a channel. A provider never returns an error to its
//! caller: failures become a single terminal [`ProviderEvent::Failed`], and
//! the channel closing marks the end of the stream.

mod client;
mod cloud;
mod local;
mod stream;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::api::{Message, ModelKind, ModelSelector};

pub use client::{build_http_client, ClientBuildError};
pub use cloud::CloudProvider;
pub use local::LocalProvider;

/// One event produced by an upstream stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Incremental text output
    Fragment(String),
    /// Terminal failure, human readable. Nothing follows it.
    Failed(String),
}

pub type EventSender = mpsc::Sender<ProviderEvent>;

/// Everything a provider needs for one exchange
#[derive(Debug, Clone)]
pub struct ProviderCall {
    /// Upstream model identifier
    pub model: String,
    /// Full outbound message list (system prompt, history, new user turn)
    pub messages: Vec<Message>,
    /// Key supplied with the request, if any
    pub api_key: Option<String>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Stream one exchange into `events`. Returns when the upstream stream is
    /// finished, has failed, or the receiver went away.
    async fn stream_chat(&self, call: ProviderCall, events: EventSender);
}

/// Which provider serves a request, decided once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Local,
    Cloud,
    Unsupported(String),
}

impl Route {
    /// Local kind always wins; otherwise the provider name must match the
    /// configured cloud provider exactly.
    pub fn resolve(model: &ModelSelector, cloud_name: &str) -> Self {
        if model.kind == ModelKind::Local {
            Route::Local
        } else if model.provider == cloud_name {
            Route::Cloud
        } else {
            Route::Unsupported(model.provider.clone())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Local => "local",
            Route::Cloud => "cloud",
            Route::Unsupported(_) => "unsupported",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two configured providers plus the name that routes to the cloud one
pub struct ProviderSet {
    pub local: std::sync::Arc<dyn ChatProvider>,
    pub cloud: std::sync::Arc<dyn ChatProvider>,
    pub cloud_name: String,
}

impl ProviderSet {
    pub fn route(&self, model: &ModelSelector) -> Route {
        Route::resolve(model, &self.cloud_name)
    }

    pub fn get(&self, route: &Route) -> Option<std::sync::Arc<dyn ChatProvider>> {
        match route {
            Route::Local => Some(self.local.clone()),
            Route::Cloud => Some(self.cloud.clone()),
            Route::Unsupported(_) => None,
        }
    }
}

/// Failures inside a provider call, rendered into [`ProviderEvent::Failed`]
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider}: pass apiKey or set {env}")]
    MissingApiKey { provider: String, env: String },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{provider} stream interrupted: {source}")]
    Stream {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// Receiver dropped; nothing left to report to
    #[error("stream cancelled by caller")]
    Cancelled,
}

/// Send an event, mapping a closed channel to [`ProviderError::Cancelled`]
pub(crate) async fn emit(events: &EventSender, event: ProviderEvent) -> Result<(), ProviderError> {
    events.send(event).await.map_err(|_| ProviderError::Cancelled)
}

/// Report a provider outcome: errors other than cancellation become one
/// terminal `Failed` event.
pub(crate) async fn finish(provider: &str, result: Result<(), ProviderError>, events: &EventSender) {
    match result {
        Ok(()) => {}
        Err(ProviderError::Cancelled) => {
            tracing::debug!(provider, "Receiver closed, upstream stream abandoned");
        }
        Err(e) => {
            tracing::warn!(provider, error = %e, "Provider call failed");
            let _ = events.send(ProviderEvent::Failed(e.to_string())).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn selector(kind: ModelKind, provider: &str) -> ModelSelector {
        ModelSelector {
            id: "m".to_string(),
            name: "M".to_string(),
            kind,
            provider: provider.to_string(),
        }
    }

    #[test]
    fn test_route_local_kind_wins() {
        let model = selector(ModelKind::Local, "Groq Cloud");
        assert_eq!(Route::resolve(&model, "Groq Cloud"), Route::Local);
    }

    #[test]
    fn test_route_cloud_by_name() {
        let model = selector(ModelKind::Cloud, "Groq Cloud");
        assert_eq!(Route::resolve(&model, "Groq Cloud"), Route::Cloud);
    }

    #[test]
    fn test_route_name_is_exact() {
        let model = selector(ModelKind::Cloud, "groq cloud");
        assert_eq!(
            Route::resolve(&model, "Groq Cloud"),
            Route::Unsupported("groq cloud".to_string())
        );

        let model = selector(ModelKind::Cloud, "OpenRouter");
        assert_eq!(Route::resolve(&model, "Groq Cloud").as_str(), "unsupported");
    }

    #[test]
    fn test_missing_key_message_names_env() {
        let err = ProviderError::MissingApiKey {
            provider: "Groq Cloud".to_string(),
            env: "GROQ_API_KEY".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("API key"));
        assert!(text.contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn test_finish_sends_single_failure() {
        let (tx, mut rx) = mpsc::channel(4);
        let err = ProviderError::MissingApiKey {
            provider: "cloud".to_string(),
            env: "KEY".to_string(),
        };
        finish("cloud", Err(err), &tx).await;
        drop(tx);

        assert!(matches!(rx.recv().await, Some(ProviderEvent::Failed(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_finish_silent_on_cancel() {
        let (tx, mut rx) = mpsc::channel(4);
        finish("local", Err(ProviderError::Cancelled), &tx).await;
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
