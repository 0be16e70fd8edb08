use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::time::Sleep;

use super::prompt::{assemble_messages, build_user_text};
use crate::api::{ChatRequest, Message};
use crate::config::{AppConfig, StatsFormat};
use crate::history::ConversationStore;
use crate::providers::{ChatProvider, ProviderCall, ProviderEvent, ProviderSet, Route};
use crate::stats::{format_chat_request, format_metrics, Outcome, RelayMetrics};

/// Relay tuning, taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub system_prompt: String,
    pub idle_timeout: Duration,
    pub total_timeout: Duration,
    pub channel_capacity: usize,
    pub stats_enabled: bool,
    pub stats_format: StatsFormat,
}

impl RelaySettings {
    pub fn from_config(config: &AppConfig, system_prompt: String) -> Self {
        Self {
            system_prompt,
            idle_timeout: Duration::from_secs(config.relay.idle_timeout_seconds),
            total_timeout: Duration::from_secs(config.relay.total_timeout_seconds),
            channel_capacity: config.relay.channel_capacity.max(1),
            stats_enabled: config.stats.enabled,
            stats_format: config.stats.format,
        }
    }
}

/// Text fragments of one exchange, in delivery order
pub struct RelayStream {
    rx: mpsc::Receiver<String>,
}

impl RelayStream {
    pub async fn next_fragment(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = String> + Send + 'static {
        futures::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|fragment| (fragment, rx))
        })
    }

    /// Drain everything; used where the caller wants the whole reply
    pub async fn collect(mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        while let Some(fragment) = self.next_fragment().await {
            fragments.push(fragment);
        }
        fragments
    }
}

/// How long a closing notice waits for room in the caller's channel
const NOTICE_GRACE: Duration = Duration::from_secs(5);

enum Delivery {
    Sent,
    Closed,
    Expired,
}

/// Routes chat requests, streams the reply and records completed exchanges
pub struct Relay {
    store: Arc<ConversationStore>,
    providers: ProviderSet,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(store: Arc<ConversationStore>, providers: ProviderSet, settings: RelaySettings) -> Self {
        Self {
            store,
            providers,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Begin an exchange. The reply is produced on a background task and
    /// delivered through the returned stream; dropping the stream cancels
    /// the exchange.
    pub fn start(self: &Arc<Self>, request: ChatRequest) -> RelayStream {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let relay = self.clone();
        tokio::spawn(async move {
            relay.drive(request, tx).await;
        });
        RelayStream { rx }
    }

    async fn drive(&self, request: ChatRequest, out: mpsc::Sender<String>) -> RelayMetrics {
        let start = Instant::now();
        let conversation_id = request.conversation_id().to_string();
        let mut metrics = RelayMetrics::new(&conversation_id, &request.model.id);

        let route = self.providers.route(&request.model);
        metrics.route = route.as_str().to_string();

        let Some(provider) = self.providers.get(&route) else {
            let name = match &route {
                Route::Unsupported(name) => name.as_str(),
                _ => "",
            };
            tracing::info!("{}", format_chat_request(&request, route.as_str(), 0));
            tracing::warn!(conversation_id = %conversation_id, provider = %name, "Unsupported provider");
            let outcome = match out.send(unsupported_message(name)).await {
                Ok(()) => Outcome::Unsupported,
                Err(_) => Outcome::Cancelled,
            };
            metrics.finish(outcome, false, start);
            self.log_metrics(&metrics);
            return metrics;
        };

        // Held from the history read until after the commit
        let _guard = tokio::select! {
            guard = self.store.lock(&conversation_id) => guard,
            _ = out.closed() => {
                tracing::debug!(conversation_id = %conversation_id, "Caller left while waiting for the conversation");
                metrics.finish(Outcome::Cancelled, false, start);
                self.log_metrics(&metrics);
                return metrics;
            }
        };

        let mut history = self.store.get(&conversation_id).await;
        metrics.history_len = history.len();
        tracing::info!("{}", format_chat_request(&request, route.as_str(), history.len()));

        let user_text = build_user_text(&request.user_text, request.document_context());
        let call = ProviderCall {
            model: request.model.id.clone(),
            messages: assemble_messages(&self.settings.system_prompt, &history, &user_text),
            api_key: request.api_key().map(str::to_string),
        };

        let (outcome, accumulated) = self.forward(provider, call, &out, &mut metrics, start).await;

        let committed = outcome == Outcome::Completed;
        if committed {
            history.push(Message::user(user_text));
            history.push(Message::assistant(accumulated));
            self.store.put(&conversation_id, history).await;
        }

        metrics.finish(outcome, committed, start);
        self.log_metrics(&metrics);
        metrics
    }

    /// Run the provider and forward its fragments until the stream ends.
    /// Returns how it ended and the text accumulated from fragments.
    async fn forward(
        &self,
        provider: Arc<dyn ChatProvider>,
        call: ProviderCall,
        out: &mpsc::Sender<String>,
        metrics: &mut RelayMetrics,
        start: Instant,
    ) -> (Outcome, String) {
        let provider_name = provider.name().to_string();
        let (events_tx, mut events) = mpsc::channel(self.settings.channel_capacity);
        let mut upstream = tokio::spawn(async move {
            provider.stream_chat(call, events_tx).await;
        });

        let deadline = tokio::time::sleep(self.settings.total_timeout);
        tokio::pin!(deadline);

        let mut accumulated = String::new();
        let (outcome, notice) = loop {
            let next = tokio::select! {
                _ = out.closed() => break (Outcome::Cancelled, None),
                _ = &mut deadline => {
                    break (Outcome::TimedOut, Some(total_timeout_message(&provider_name, self.settings.total_timeout)));
                }
                next = tokio::time::timeout(self.settings.idle_timeout, events.recv()) => next,
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => break self.drained(&mut upstream, &accumulated, &provider_name).await,
                Err(_) => {
                    tracing::warn!(provider = %provider_name, idle_secs = self.settings.idle_timeout.as_secs(), "Upstream went idle");
                    break (Outcome::TimedOut, Some(idle_timeout_message(&provider_name, self.settings.idle_timeout)));
                }
            };

            match event {
                ProviderEvent::Fragment(text) => {
                    metrics.record_fragment(&text, start);
                    accumulated.push_str(&text);
                    match deliver(out, text, deadline.as_mut()).await {
                        Delivery::Sent => {}
                        Delivery::Closed => break (Outcome::Cancelled, None),
                        Delivery::Expired => {
                            break (Outcome::TimedOut, Some(total_timeout_message(&provider_name, self.settings.total_timeout)));
                        }
                    }
                }
                ProviderEvent::Failed(text) => break (Outcome::Failed, Some(text)),
            }
        };

        if !upstream.is_finished() {
            tracing::debug!(provider = %provider_name, outcome = %outcome, "Aborting upstream call");
            upstream.abort();
        }

        let outcome = match notice {
            Some(text) => match deliver_notice(out, text).await {
                Delivery::Sent => outcome,
                Delivery::Closed => Outcome::Cancelled,
                Delivery::Expired => {
                    tracing::warn!(provider = %provider_name, outcome = %outcome, "Caller did not read the closing notice");
                    outcome
                }
            },
            None => outcome,
        };

        (outcome, accumulated)
    }

    /// The event channel closed; decide whether the provider really finished
    async fn drained(
        &self,
        upstream: &mut tokio::task::JoinHandle<()>,
        accumulated: &str,
        provider_name: &str,
    ) -> (Outcome, Option<String>) {
        match upstream.await {
            Ok(()) if accumulated.is_empty() => (Outcome::Empty, None),
            Ok(()) => (Outcome::Completed, None),
            Err(e) => {
                tracing::error!(provider = %provider_name, error = %e, "Provider task ended abnormally");
                (Outcome::Failed, Some(format!("Error: {} stopped unexpectedly", provider_name)))
            }
        }
    }

    fn log_metrics(&self, metrics: &RelayMetrics) {
        if !self.settings.stats_enabled {
            return;
        }
        let formatted = format_metrics(metrics, self.settings.stats_format);
        match self.settings.stats_format {
            StatsFormat::Pretty => tracing::info!("\n{}", formatted),
            _ => tracing::info!("{}", formatted),
        }
    }
}

/// Send one fragment, giving up if the caller leaves or time runs out
async fn deliver(out: &mpsc::Sender<String>, text: String, deadline: Pin<&mut Sleep>) -> Delivery {
    tokio::select! {
        sent = out.send(text) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        },
        _ = deadline => Delivery::Expired,
    }
}

/// Send the closing fragment of an exchange. The reply deadline may already
/// have passed, so a slow caller gets a short grace period of its own.
async fn deliver_notice(out: &mpsc::Sender<String>, text: String) -> Delivery {
    match tokio::time::timeout(NOTICE_GRACE, out.send(text)).await {
        Ok(Ok(())) => Delivery::Sent,
        Ok(Err(_)) => Delivery::Closed,
        Err(_) => Delivery::Expired,
    }
}

fn unsupported_message(provider: &str) -> String {
    if provider.is_empty() {
        "Unsupported provider.".to_string()
    } else {
        format!("Unsupported provider: {}", provider)
    }
}

fn idle_timeout_message(provider: &str, idle: Duration) -> String {
    format!("Error: no response from {} for {}s", provider, idle.as_secs())
}

fn total_timeout_message(provider: &str, total: Duration) -> String {
    format!("Error: response from {} exceeded {}s", provider, total.as_secs())
}
