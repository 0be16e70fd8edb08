//! Relay server setup

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{chat_handler, health_handler, upload_handler};
use crate::config::{AppConfig, ConfigError, CorsConfig};
use crate::documents::ExtractorRegistry;
use crate::history::ConversationStore;
use crate::providers::{build_http_client, ClientBuildError, CloudProvider, LocalProvider, ProviderSet};
use crate::relay::{Relay, RelaySettings};

/// Shared state for the handlers
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<AppConfig>,
    pub relay: Arc<Relay>,
    pub extractors: Arc<ExtractorRegistry>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] ClientBuildError),

    #[error("Invalid listen address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayState {
    /// Wire providers, history and relay from configuration. The server-side
    /// cloud key is resolved here, once.
    pub fn from_config(config: AppConfig) -> Result<Self, ServerError> {
        let system_prompt = config.relay.load_system_prompt()?;

        let local = &config.providers.local;
        let local_client = build_http_client(local.timeout_seconds, None)?;
        let local_provider = LocalProvider::new(local_client, local.chat_url());

        let cloud = &config.providers.cloud;
        let cloud_client = build_http_client(cloud.timeout_seconds, cloud.tls.as_ref())?;
        let default_key = cloud.resolve_api_key();
        if default_key.is_some() {
            tracing::info!(provider = %cloud.name, "Server-side API key configured");
        } else {
            tracing::info!(
                provider = %cloud.name,
                env = %cloud.api_key_env,
                "No server-side API key; requests must carry apiKey"
            );
        }
        let cloud_provider = CloudProvider::new(
            cloud_client,
            cloud.name.clone(),
            cloud.chat_url(),
            default_key,
            cloud.api_key_env.clone(),
        );

        let providers = ProviderSet {
            local: Arc::new(local_provider),
            cloud: Arc::new(cloud_provider),
            cloud_name: cloud.name.clone(),
        };

        let store = Arc::new(ConversationStore::new(config.history.limit()));
        let settings = RelaySettings::from_config(&config, system_prompt);
        let relay = Arc::new(Relay::new(store, providers, settings));

        Ok(Self {
            config: Arc::new(config),
            relay,
            extractors: Arc::new(ExtractorRegistry::with_defaults()),
        })
    }
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the router
pub fn build_router(state: RelayState) -> Router {
    // Leave room for multipart framing around the file itself
    let upload_limit = state.config.documents.max_upload_bytes + 64 * 1024;

    Router::new()
        // Health check
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route(
            "/upload-document",
            post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/upload-pdf",
            post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let local_url = config.providers.local.chat_url();
    let cloud_url = config.providers.cloud.chat_url();

    let state = RelayState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("chat-relay listening on {}", addr);
    tracing::info!("Local provider: {}", local_url);
    tracing::info!("Cloud provider: {}", cloud_url);

    Ok(axum::serve(listener, app).await?)
}
