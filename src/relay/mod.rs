//! Relay orchestration
//!
//! A request is routed once, its outbound message list is assembled from the
//! stored history, and the provider's fragments are forwarded to the caller
//! as they arrive. Only an exchange whose upstream stream drained normally
//! with some text is written back to history.

mod orchestrator;
mod prompt;

pub use orchestrator::{Relay, RelaySettings, RelayStream};
pub use prompt::{assemble_messages, build_user_text};
