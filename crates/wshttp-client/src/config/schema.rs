use serde::Deserialize;
use wshttp_core::error::{Result, WsHttpError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub client: ClientSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WsHttpError::UnsupportedVersion);
        }

        self.client.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default)]
    pub reconnect: ReconnectSection,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            health_interval_ms: default_health_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            reconnect: ReconnectSection::default(),
        }
    }
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(WsHttpError::BadRequest(
                "client.url must start with ws:// or wss://".into(),
            ));
        }
        if !(1000..=600000).contains(&self.health_interval_ms) {
            return Err(WsHttpError::BadRequest(
                "client.health_interval_ms must be between 1000 and 600000".into(),
            ));
        }
        if !(100..=600000).contains(&self.request_timeout_ms) {
            return Err(WsHttpError::BadRequest(
                "client.request_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(WsHttpError::BadRequest(
                "client.outbound_queue must be greater than 0".into(),
            ));
        }
        self.reconnect.validate()
    }
}

/// Reconnect tuning. The defaults reconnect on every failed health check
/// with no delay and no attempt limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default)]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay_ms: 0,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(WsHttpError::BadRequest(
                "client.reconnect.max_attempts must be at least 1 (omit it for no limit)".into(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(WsHttpError::BadRequest(
                "client.reconnect.max_delay_ms must not be less than base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/websocket/http".into()
}
fn default_health_interval_ms() -> u64 {
    4500
}
fn default_request_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_max_delay_ms() -> u64 {
    60000
}
