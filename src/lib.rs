//! chat-relay: streaming chat relay for local and cloud LLM providers
//!
//! Features:
//! - One `/chat` endpoint routed to a local NDJSON server or a hosted SSE API
//! - Incremental forwarding of generated text as plain-text chunks
//! - Per-conversation in-memory history, committed only on clean completion
//! - Text extraction from uploaded PDF and plain-text documents

pub mod api;
pub mod config;
pub mod decode;
pub mod documents;
pub mod history;
pub mod providers;
pub mod relay;
pub mod server;
pub mod stats;

pub use config::AppConfig;
pub use server::run_server;
