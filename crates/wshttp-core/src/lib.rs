//! wshttp core: wire envelopes, body codecs, and the resolve-once call table.
//!
//! This crate defines the request/response contracts shared by the client
//! `ConnectionManager` and the server peer. It carries no transport
//! dependency; the only runtime piece it uses is `tokio::sync::oneshot` for
//! pending calls.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! Malformed frames and unknown codecs surface as `WsHttpError` or as a logged,
//! fail-soft result so a misbehaving peer cannot take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod pending;
pub mod protocol;
pub mod registry;

/// Shared result type.
pub use error::{Result, WsHttpError};
pub use pending::{PendingCall, PendingTable, Responder};
pub use protocol::envelope::{FrameKind, SocketRequest, SocketResponse};
pub use protocol::sign::Sign;
pub use registry::HandlerRegistry;
