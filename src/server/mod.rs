//! HTTP boundary

mod error;
mod handlers;
mod router;

pub use error::ApiError;
pub use router::{build_router, run_server, RelayState, ServerError};
