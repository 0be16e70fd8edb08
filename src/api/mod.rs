//! Wire types: the relay's own request shape and the upstream chat APIs

mod chat;
mod message;
mod ollama;
mod openai;

pub use chat::*;
pub use message::*;
pub use ollama::*;
pub use openai::*;
