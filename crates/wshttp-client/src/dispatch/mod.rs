//! Inbound request handlers.
//!
//! Re-exports the handler trait and closure adapter so downstream consumers
//! can depend on this module directly.

pub mod handler;

pub use handler::{ClientHandler, FnHandler};
