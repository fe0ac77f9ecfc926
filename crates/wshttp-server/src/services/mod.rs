//! Built-in handlers.

pub mod chat;
pub mod health;

pub use chat::ChatService;
pub use health::HealthService;
