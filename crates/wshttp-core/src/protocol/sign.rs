//! Body codecs selected by the envelope `sign`.
//!
//! `try_encode`/`try_decode` report failures; `encode`/`decode` are the
//! fail-soft forms used on the wire path: they log and return an empty body.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, WsHttpError};

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Body transform named by an envelope's `sign` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// `""`: body is passed through untouched.
    Passthrough,
    /// `"none"`: identity.
    None,
    /// `"base64"`: standard alphabet, padded.
    Base64,
    /// `"url"`: percent-encoding.
    Url,
}

impl Sign {
    pub fn parse(s: &str) -> Result<Sign> {
        match s {
            "" => Ok(Sign::Passthrough),
            "none" => Ok(Sign::None),
            "base64" => Ok(Sign::Base64),
            "url" => Ok(Sign::Url),
            other => Err(WsHttpError::UnknownSign(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sign::Passthrough => "",
            Sign::None => "none",
            Sign::Base64 => "base64",
            Sign::Url => "url",
        }
    }

    pub fn encode(self, body: &str) -> String {
        match self {
            Sign::Passthrough | Sign::None => body.to_string(),
            Sign::Base64 => STANDARD.encode(body.as_bytes()),
            Sign::Url => utf8_percent_encode(body, URI_COMPONENT).to_string(),
        }
    }

    pub fn decode(self, body: &str) -> Result<String> {
        match self {
            Sign::Passthrough | Sign::None => Ok(body.to_string()),
            Sign::Base64 => {
                let raw = STANDARD.decode(body.as_bytes()).map_err(|e| WsHttpError::Codec {
                    sign: "base64",
                    reason: e.to_string(),
                })?;
                String::from_utf8(raw).map_err(|e| WsHttpError::Codec {
                    sign: "base64",
                    reason: format!("decoded body is not utf-8: {e}"),
                })
            }
            Sign::Url => percent_decode_str(body)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|e| WsHttpError::Codec {
                    sign: "url",
                    reason: e.to_string(),
                }),
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn try_encode(sign: &str, body: &str) -> Result<String> {
    Ok(Sign::parse(sign)?.encode(body))
}

pub fn try_decode(sign: &str, body: &str) -> Result<String> {
    Sign::parse(sign)?.decode(body)
}

/// Encode `body` per `sign`. Unknown signs log an error and yield `""`.
pub fn encode(sign: &str, body: &str) -> String {
    try_encode(sign, body).unwrap_or_else(|e| {
        tracing::error!(error = %e, sign, "body encode failed");
        String::new()
    })
}

/// Decode `body` per `sign`. Unknown signs and undecodable bodies log and yield `""`.
pub fn decode(sign: &str, body: &str) -> String {
    try_decode(sign, body).unwrap_or_else(|e| {
        tracing::error!(error = %e, sign, "body decode failed");
        String::new()
    })
}
