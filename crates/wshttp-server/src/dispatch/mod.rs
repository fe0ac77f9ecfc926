//! Request handlers.
//!
//! Re-exports the handler trait, its per-call context, and the closure
//! adapter.

pub mod handler;

pub use handler::{FnHandler, ServerHandler, SocketContext};
