use serde::Deserialize;
use wshttp_core::error::{Result, WsHttpError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WsHttpError::UnsupportedVersion);
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_path")]
    pub path: String,

    /// Register `Health/Index` and close channels that stop sending it.
    #[serde(default)]
    pub heartbeat: bool,

    #[serde(default)]
    pub heartbeat_logs: bool,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            heartbeat: false,
            heartbeat_logs: false,
            idle_timeout_ms: default_idle_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(WsHttpError::BadRequest("server.path must start with '/'".into()));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(WsHttpError::BadRequest(
                "server.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if !(100..=600000).contains(&self.request_timeout_ms) {
            return Err(WsHttpError::BadRequest(
                "server.request_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.max_frame_bytes == 0 || self.outbound_queue == 0 {
            return Err(WsHttpError::BadRequest(
                "server.max_frame_bytes and server.outbound_queue must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_path() -> String {
    "/websocket/http".into()
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_request_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    1 << 20
}
fn default_outbound_queue() -> usize {
    1024
}
