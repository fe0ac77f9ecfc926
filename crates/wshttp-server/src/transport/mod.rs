//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that classifies each frame
//! once, by lane, before it reaches the handler or pending-call paths.

pub mod codec;
pub mod ws;
