//! chat-relay: streaming chat relay for local and cloud LLM providers
//!
//! Accepts chat messages over HTTP, forwards them to a local inference
//! server or a hosted API, and streams the generated text back while
//! keeping a short in-memory conversation history.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_relay::{
    config::{AppConfig, ConfigError},
    providers::build_http_client,
    run_server,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(version = "0.1.0")]
#[command(about = "Streaming chat relay for local and cloud LLM providers")]
#[command(long_about = "
chat-relay forwards chat messages to a local inference server (NDJSON) or a
hosted OpenAI-compatible API (SSE) and streams the reply back as plain text:
  - Per-conversation in-memory history
  - Partial or failed replies are never recorded
  - Text extraction from uploaded PDF / text documents

Example usage:
  chat-relay run --config config.yaml
  chat-relay check-config
")]
struct Cli {
    /// Path to config file (defaults are used when omitted and none is found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override local provider URL (e.g., "http://127.0.0.1:11434")
        #[arg(long)]
        local_url: Option<String>,
    },

    /// Validate configuration file
    CheckConfig,

    /// Test connections to the configured providers
    TestProviders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level.to_string()),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    match cli.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    match cli.command {
        Commands::Run { port, local_url } => {
            run_relay(cli.config.as_deref(), port, local_url).await?;
        }
        Commands::CheckConfig => {
            check_config(cli.config.as_deref());
        }
        Commands::TestProviders => {
            test_providers(cli.config.as_deref()).await?;
        }
    }

    Ok(())
}

/// Run the relay server
async fn run_relay(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    local_url_override: Option<String>,
) -> anyhow::Result<()> {
    let mut config = load_config_or_exit(config_path);

    // Apply CLI overrides
    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = local_url_override {
        config.providers.local.url = url;
        config.validate()?;
    }

    run_server(config).await?;

    Ok(())
}

/// Validate configuration file
fn check_config(config_path: Option<&Path>) {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let local = &config.providers.local;
    let cloud = &config.providers.cloud;

    println!("✓ Configuration file is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    if config.cors.allowed_origins.is_empty() {
        println!("  CORS: any origin");
    } else {
        println!("  CORS: {}", config.cors.allowed_origins.join(", "));
    }
    println!("\nLocal provider:");
    println!("  URL: {}", local.chat_url());
    println!("  Timeout: {}s", local.timeout_seconds);
    println!("\nCloud provider:");
    println!("  Name: {}", cloud.name);
    println!("  URL: {}", cloud.chat_url());
    println!("  TLS: {}", if cloud.is_tls() { "enabled" } else { "disabled" });
    if let Some(ref tls) = cloud.tls {
        if tls.accept_invalid_certs {
            println!("  TLS: Accepting invalid certificates");
        }
        if let Some(ref ca) = tls.ca_cert_path {
            println!("  TLS CA: {}", ca);
        }
        if let Some(ref cert) = tls.client_cert_path {
            println!("  TLS Client Cert: {}", cert);
        }
    }
    println!(
        "  Server API key: {}",
        if cloud.resolve_api_key().is_some() {
            "configured".to_string()
        } else {
            format!("not set (set {} or send apiKey)", cloud.api_key_env)
        }
    );
    println!("  Timeout: {}s", cloud.timeout_seconds);
    println!("\nRelay:");
    match config.relay.system_prompt_file {
        Some(ref path) => println!("  System prompt: file {}", path),
        None => println!("  System prompt: {} chars", config.relay.system_prompt.chars().count()),
    }
    println!("  Idle timeout: {}s", config.relay.idle_timeout_seconds);
    println!("  Total timeout: {}s", config.relay.total_timeout_seconds);
    println!("\nHistory:");
    match config.history.limit() {
        Some(max) => println!("  Max messages: {}", max),
        None => println!("  Max messages: unbounded"),
    }
    println!("\nDocuments:");
    println!("  Preview: {} chars", config.documents.preview_chars);
    println!("  Max upload: {} bytes", config.documents.max_upload_bytes);
    println!("\nStats:");
    println!("  Enabled: {}", config.stats.enabled);
    println!("  Format: {:?}", config.stats.format);
}

/// Test connections to the local server and the cloud API
async fn test_providers(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config_or_exit(config_path);

    let local = &config.providers.local;
    let tags_url = format!("{}/api/tags", local.base_url());
    println!("Testing local provider: {}", tags_url);

    let client = build_http_client(5, None)?;
    match client.get(&tags_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("✓ Local provider is reachable");
            if let Ok(json) = resp.json::<serde_json::Value>().await {
                if let Some(models) = json.get("models").and_then(|m| m.as_array()) {
                    println!("  Available models: {}", models.len());
                    for model in models.iter().take(5) {
                        if let Some(name) = model.get("name").and_then(|n| n.as_str()) {
                            println!("    - {}", name);
                        }
                    }
                }
            }
        }
        Ok(resp) => println!("✗ Local provider returned error status: {}", resp.status()),
        Err(e) => println!("✗ Failed to connect to local provider: {}", e),
    }

    let cloud = &config.providers.cloud;
    let models_url = format!("{}/models", cloud.base_url());
    println!("\nTesting cloud provider ({}): {}", cloud.name, models_url);

    let Some(key) = cloud.resolve_api_key() else {
        println!("  Skipped: no server-side API key (set {})", cloud.api_key_env);
        return Ok(());
    };

    let client = build_http_client(cloud.timeout_seconds.min(10), cloud.tls.as_ref())?;
    match client
        .get(&models_url)
        .bearer_auth(key)
        .timeout(Duration::from_secs(10))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            println!("✓ Cloud provider accepted the API key");
            if let Ok(json) = resp.json::<serde_json::Value>().await {
                if let Some(data) = json.get("data").and_then(|d| d.as_array()) {
                    println!("  Available models: {}", data.len());
                    for model in data.iter().take(5) {
                        if let Some(id) = model.get("id").and_then(|i| i.as_str()) {
                            println!("    - {}", id);
                        }
                    }
                }
            }
        }
        Ok(resp) => println!("✗ Cloud provider returned error status: {}", resp.status()),
        Err(e) => println!("✗ Failed to connect to cloud provider: {}", e),
    }

    Ok(())
}

/// Explicit paths must exist; otherwise fall back to defaults
fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match AppConfig::load_or_default(config_path) {
        Err(ConfigError::NotFound(_)) if config_path.is_none() => {
            tracing::info!("No config file found, using built-in defaults");
            Ok(AppConfig::default())
        }
        other => other,
    }
}

/// Load configuration or exit with error
fn load_config_or_exit(config_path: Option<&Path>) -> AppConfig {
    match load_config(config_path) {
        Ok(config) => {
            if let Some(path) = config_path {
                tracing::info!("Loaded configuration from {:?}", path);
            }
            config
        }
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nYou can copy config.yaml.default and modify it:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    }
}
