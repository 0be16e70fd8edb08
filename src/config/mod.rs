mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Relay server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Browser origins allowed to call the relay
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Upstream providers
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub local: LocalProviderConfig,
    #[serde(default)]
    pub cloud: CloudProviderConfig,
}

/// Local inference server (NDJSON streaming)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalProviderConfig {
    /// Base URL (e.g., "http://127.0.0.1:11434")
    #[serde(default = "default_local_url")]
    pub url: String,
    /// Path of the streaming chat endpoint
    #[serde(default = "default_local_chat_path")]
    pub chat_path: String,
    /// Connect and per-read timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_local_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_local_chat_path() -> String {
    "/api/chat".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            url: default_local_url(),
            chat_path: default_local_chat_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl LocalProviderConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Full URL of the streaming chat endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.chat_path.trim_start_matches('/'))
    }
}

/// Hosted OpenAI-compatible API (SSE streaming)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudProviderConfig {
    /// Provider name a request must carry to be routed here
    #[serde(default = "default_cloud_name")]
    pub name: String,
    /// Base URL including the API version (e.g., "https://api.groq.com/openai/v1")
    #[serde(default = "default_cloud_url")]
    pub url: String,
    /// Server-side default API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Connect and per-read timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// TLS configuration options
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_cloud_name() -> String {
    "Groq Cloud".to_string()
}

fn default_cloud_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            name: default_cloud_name(),
            url: default_cloud_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout(),
            tls: None,
        }
    }
}

impl CloudProviderConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Full URL of the chat completions endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.url.to_lowercase().starts_with("https://")
    }

    /// Server-side default key: the literal config value, else the
    /// environment variable. Empty values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// TLS configuration for upstream connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
    /// Path to client certificate for mTLS
    pub client_cert_path: Option<String>,
    /// Path to client private key for mTLS
    pub client_key_path: Option<String>,
}

/// Streaming relay behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// System prompt placed first in every upstream message list
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// File whose contents replace `system_prompt`
    #[serde(default)]
    pub system_prompt_file: Option<String>,
    /// Give up when no upstream event arrives for this long
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Hard limit for one streamed exchange
    #[serde(default = "default_total_timeout")]
    pub total_timeout_seconds: u64,
    /// Fragments buffered between stages; 1 keeps delivery lock-step
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and knowledgeable nutrition assistant. \
When asked for a menu, diet or meal plan, give a complete example adapted to the user's \
intolerances, preferences and budget, then add a short note that it is an educational example \
and not a substitute for professional advice. Be concise and use a compact format.";

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_idle_timeout() -> u64 {
    90
}

fn default_total_timeout() -> u64 {
    600
}

fn default_channel_capacity() -> usize {
    1
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            system_prompt_file: None,
            idle_timeout_seconds: default_idle_timeout(),
            total_timeout_seconds: default_total_timeout(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl RelayConfig {
    /// The effective system prompt, reading `system_prompt_file` if set
    pub fn load_system_prompt(&self) -> Result<String, ConfigError> {
        match self.system_prompt_file {
            Some(ref path) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
            None => Ok(self.system_prompt.clone()),
        }
    }
}

/// Conversation history retention
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Messages kept per conversation; 0 keeps everything
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_max_messages() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
        }
    }
}

impl HistoryConfig {
    pub fn limit(&self) -> Option<usize> {
        (self.max_messages > 0).then_some(self.max_messages)
    }
}

/// Document upload configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentsConfig {
    /// Characters shown in the upload preview before "..."
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Largest accepted upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_preview_chars() -> usize {
    500
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Stats logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: StatsFormat,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            format: StatsFormat::default(),
        }
    }
}

/// Stats output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Pretty,
    Json,
    #[default]
    Compact,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            providers: ProvidersConfig::default(),
            relay: RelayConfig::default(),
            history: HistoryConfig::default(),
            documents: DocumentsConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration with fallback to default path
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                // Try default locations
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                Err(ConfigError::NotFound(
                    "No config file found. Tried: config.yaml, config.yml, ./config/config.yaml"
                        .to_string(),
                ))
            }
        }
    }

    /// Check values serde can't
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("providers.local.url", &self.providers.local.url)?;
        validate_http_url("providers.cloud.url", &self.providers.cloud.url)?;

        if self.providers.cloud.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "providers.cloud.name must not be empty".to_string(),
            ));
        }
        if self.relay.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "relay.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.relay.idle_timeout_seconds == 0 || self.relay.total_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "relay timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.providers.local.timeout_seconds == 0 || self.providers.cloud.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "provider timeout_seconds must be at least 1".to_string(),
            ));
        }
        // Retention trims whole user/assistant pairs
        if self.history.max_messages == 1 {
            return Err(ConfigError::Validation(
                "history.max_messages must be 0 (unbounded) or at least 2".to_string(),
            ));
        }
        if self.documents.preview_chars == 0 {
            return Err(ConfigError::Validation(
                "documents.preview_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{} is not a valid URL ({}): {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
