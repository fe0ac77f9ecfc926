//! Request/response envelopes (JSON).
//!
//! Field names are fixed by the existing server peer: the id travels as
//! `uid` (`id` is accepted on input). Every field is optional on input so a
//! bare `{code, msg}` object still parses; `header: null` reads as empty.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, WsHttpError};

/// Success.
pub const CODE_SUCCESS: i32 = 0;
/// Server-side pending call expired.
pub const CODE_TIMEOUT: i32 = -1;
/// Request frame could not be parsed.
pub const CODE_BAD_REQUEST: i32 = -2;
/// Client-local transport failure (faulted, closed, or timed out).
pub const CODE_FAILED_TO_SEND: i32 = -3;

/// Reserved `msg` for transport failure.
pub const MSG_FAILED_TO_SEND: &str = "failed_to_send";
/// `msg` used with [`CODE_TIMEOUT`].
pub const MSG_TIMEOUT: &str = "timeout";
/// `msg` used with [`CODE_BAD_REQUEST`].
pub const MSG_BAD_REQUEST: &str = "bad_request";

/// Default sign for freshly built envelopes.
pub const DEFAULT_SIGN: &str = "none";

/// Which WebSocket frame kind an envelope travels in.
///
/// Requests are text, responses are binary. The router classifies inbound
/// frames with this instead of peeking at the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

impl FrameKind {
    /// Frame kind carrying requests.
    pub const REQUEST: FrameKind = FrameKind::Text;
    /// Frame kind carrying responses.
    pub const RESPONSE: FrameKind = FrameKind::Binary;

    pub fn is_request(self) -> bool {
        self == Self::REQUEST
    }

    pub fn is_response(self) -> bool {
        self == Self::RESPONSE
    }
}

/// Request envelope (text frame).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRequest {
    /// Unique per call; echoed by the response.
    #[serde(rename = "uid", alias = "id", default)]
    pub uid: String,
    /// Target handler name.
    #[serde(default)]
    pub handler: String,
    /// Target method name.
    #[serde(default)]
    pub method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: HashMap<String, String>,
    /// Body, encoded per `sign` while on the wire.
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sign: String,
}

impl SocketRequest {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            handler: String::new(),
            method: String::new(),
            header: HashMap::new(),
            body: String::new(),
            sign: DEFAULT_SIGN.to_string(),
        }
    }

    /// Build a request with a fresh uid.
    pub fn call(handler: impl Into<String>, method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
            body: body.into(),
            ..Self::new(generate_uid())
        }
    }

    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = sign.into();
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| WsHttpError::Internal(format!("encode request failed: {e}")))
    }
}

/// Response envelope (binary frame).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketResponse {
    /// Originating request uid; empty when unsolicited.
    #[serde(rename = "uid", alias = "id", default)]
    pub uid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: HashMap<String, String>,
    /// 0 = success, negative = local failure.
    #[serde(default)]
    pub code: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sign: String,
}

impl SocketResponse {
    /// Blank success response answering `uid`.
    pub fn for_request(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            header: HashMap::new(),
            code: CODE_SUCCESS,
            msg: String::new(),
            body: String::new(),
            sign: DEFAULT_SIGN.to_string(),
        }
    }

    /// Response-shaped local failure. Carries no body and no sign.
    pub fn failure(uid: impl Into<String>, code: i32, msg: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            header: HashMap::new(),
            code,
            msg: msg.into(),
            body: String::new(),
            sign: String::new(),
        }
    }

    /// The synthetic `{-3, "failed_to_send"}` result.
    pub fn failed_to_send(uid: impl Into<String>) -> Self {
        Self::failure(uid, CODE_FAILED_TO_SEND, MSG_FAILED_TO_SEND)
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    /// True for the transport-failure sentinel (what the health monitor reacts to).
    pub fn is_failed_to_send(&self) -> bool {
        self.code != CODE_SUCCESS && self.msg == MSG_FAILED_TO_SEND
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| WsHttpError::Internal(format!("encode response failed: {e}")))
    }
}

/// Parse a request envelope from a text frame payload.
pub fn request_from_str(s: &str) -> Result<SocketRequest> {
    serde_json::from_str(s).map_err(|e| WsHttpError::BadRequest(format!("invalid request json: {e}")))
}

/// Parse a response envelope from a binary frame payload.
pub fn response_from_slice(b: &[u8]) -> Result<SocketResponse> {
    let text = std::str::from_utf8(b)
        .map_err(|e| WsHttpError::BadRequest(format!("response frame is not utf-8: {e}")))?;
    serde_json::from_str(text).map_err(|e| WsHttpError::BadRequest(format!("invalid response json: {e}")))
}

/// Random v4 uuid, hyphenated lowercase.
pub fn generate_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn request_serializes_uid_field() {
        let mut req = SocketRequest::new("abc");
        req.handler = "Echo".into();
        req.method = "Ping".into();
        let v: serde_json::Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(v["uid"], "abc");
        assert_eq!(v["sign"], "none");
        assert!(v["header"].is_object());
        assert!(v.get("id").is_none());
    }

    #[test]
    fn bare_error_object_parses_as_response() {
        let resp = response_from_slice(br#"{"code":-3,"msg":"failed_to_send"}"#).unwrap();
        assert!(resp.uid.is_empty());
        assert!(resp.is_failed_to_send());
    }

    #[test]
    fn failed_to_send_needs_nonzero_code() {
        let mut resp = SocketResponse::failed_to_send("x");
        assert!(resp.is_failed_to_send());
        resp.code = CODE_SUCCESS;
        assert!(!resp.is_failed_to_send());
    }

    #[test]
    fn uids_are_unique_and_hyphenated() {
        let a = generate_uid();
        let b = generate_uid();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.matches('-').count(), 4);
    }

    #[test]
    fn frame_kind_discriminates_lanes() {
        assert!(FrameKind::Text.is_request());
        assert!(FrameKind::Binary.is_response());
        assert!(!FrameKind::Binary.is_request());
    }
}
