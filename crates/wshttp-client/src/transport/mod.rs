//! Transport layer (WebSocket client).
//!
//! The codec classifies frames once; the session task owns the socket and
//! multiplexes the outbound queue with the inbound stream.

pub mod codec;
pub(crate) mod session;
