//! Shared error type across wshttp crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, WsHttpError>;

/// Unified error type used by core, client and server.
#[derive(Debug, Error)]
pub enum WsHttpError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown body sign: {0:?}")]
    UnknownSign(String),
    #[error("body codec failed ({sign}): {reason}")]
    Codec { sign: &'static str, reason: String },
    #[error("duplicate request uid: {0}")]
    DuplicateUid(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl WsHttpError {
    /// Stable string code, used in logs and config diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            WsHttpError::BadRequest(_) => "BAD_REQUEST",
            WsHttpError::UnknownSign(_) => "UNKNOWN_SIGN",
            WsHttpError::Codec { .. } => "CODEC",
            WsHttpError::DuplicateUid(_) => "DUPLICATE_UID",
            WsHttpError::Transport(_) => "TRANSPORT",
            WsHttpError::UnsupportedVersion => "UNSUPPORTED_VERSION",
            WsHttpError::Internal(_) => "INTERNAL",
        }
    }
}
