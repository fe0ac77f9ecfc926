//! Client config loader (strict parsing).
//!
//! The `wshttp-client` binary reads `wshttp-client.yaml` from the working directory
//! unless a path is given as its first argument. Only `version: 1` is
//! accepted, and unknown keys are rejected at any depth.

pub mod schema;

use std::fs;

use wshttp_core::error::{Result, WsHttpError};

pub use schema::{ClientConfig, ClientSection, ReconnectSection};

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WsHttpError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| WsHttpError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
