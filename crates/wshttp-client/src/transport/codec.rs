//! Decode-once codec for the client transport.
//!
//! - Text frames => `SocketRequest` (server-initiated call)
//! - Binary frames => `SocketResponse` (answer to one of our calls)
//! - Ping/Pong/Close are surfaced for lifecycle management

use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

use wshttp_core::{
    error::{Result, WsHttpError},
    protocol::envelope::{request_from_str, response_from_slice},
    FrameKind, SocketRequest, SocketResponse,
};

#[derive(Debug)]
pub enum Inbound {
    Request(SocketRequest),
    Response(SocketResponse),
    Ping(Bytes),
    Pong,
    Close,
}

/// Protocol lane of a data frame; `None` for control frames.
pub fn frame_kind(msg: &Message) -> Option<FrameKind> {
    match msg {
        Message::Text(_) => Some(FrameKind::Text),
        Message::Binary(_) => Some(FrameKind::Binary),
        _ => None,
    }
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Request(request_from_str(s.as_str())?)),
        Message::Binary(b) => Ok(Inbound::Response(response_from_slice(&b)?)),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
        Message::Frame(_) => Err(WsHttpError::BadRequest("unexpected raw frame".into())),
    }
}

/// Requests go out on the text lane.
pub fn encode_request(req: &SocketRequest) -> Result<Message> {
    Ok(Message::text(req.to_json()?))
}

/// Responses go out on the binary lane.
pub fn encode_response(resp: &SocketResponse) -> Result<Message> {
    Ok(Message::binary(resp.to_json_bytes()?))
}
