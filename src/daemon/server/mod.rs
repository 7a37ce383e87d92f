//! Extension server module for Unix socket-based communication.

mod connection;
mod core;
mod lifecycle;


pub use self::core::{ExtServer, ServerStatus};
pub use lifecycle::bind_listener;
