//! Exchange metrics and request logging

mod collector;
mod formatter;
mod request_log;

pub use collector::*;
pub use formatter::*;
pub use request_log::*;
