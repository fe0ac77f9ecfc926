//! wshttp client library entry.
//!
//! `ConnectionManager` owns one WebSocket connection and speaks the
//! request/response protocol over it in both directions: outbound calls are
//! correlated by uid, inbound requests are routed to registered handlers.
//! The health monitor reconnects when round-trips start failing.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod dispatch;
pub mod health;
pub mod manager;
pub mod transport;

pub use dispatch::{ClientHandler, FnHandler};
pub use health::{HealthOutcome, ReconnectPolicy};
pub use manager::{ConnectionManager, ManagerOptions, OnOpen};
