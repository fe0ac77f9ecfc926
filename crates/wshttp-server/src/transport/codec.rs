//! Decode-once codec for the server transport.
//!
//! - Text frames => `SocketRequest` (call from the client)
//! - Binary frames => `SocketResponse` (answer to one of our calls)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use wshttp_core::{
    error::Result,
    protocol::envelope::{request_from_str, response_from_slice},
    FrameKind, SocketRequest, SocketResponse,
};

#[derive(Debug)]
pub enum Inbound {
    Request(SocketRequest),
    Response(SocketResponse),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn frame_kind(msg: &Message) -> Option<FrameKind> {
    match msg {
        Message::Text(_) => Some(FrameKind::Text),
        Message::Binary(_) => Some(FrameKind::Binary),
        _ => None,
    }
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Request(request_from_str(&s)?)),
        Message::Binary(b) => Ok(Inbound::Response(response_from_slice(&b)?)),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode_request(req: &SocketRequest) -> Result<Message> {
    Ok(Message::Text(req.to_json()?))
}

pub fn encode_response(resp: &SocketResponse) -> Result<Message> {
    Ok(Message::Binary(resp.to_json_bytes()?))
}

/// Cheap length check before decoding.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
