//! Protocol modules (envelopes + body codecs).
//!
//! Requests travel as text frames and responses as binary frames; both carry
//! a JSON envelope. The frame kind is the only discriminator between the two,
//! so transports must preserve it (`FrameKind`).

pub mod envelope;
pub mod sign;
