//! Health monitor.
//!
//! Every `health_interval` the monitor sends `Health/Index` (body = unix time
//! in ms) through the normal call path. A `failed_to_send` result means the
//! transport is gone and the recorded url is re-opened. Without a recorded
//! url (never opened, or closed) a tick does nothing.

use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;

use crate::config::ReconnectSection;
use crate::manager::ConnectionManager;

pub const HEALTH_HANDLER: &str = "Health";
pub const HEALTH_METHOD: &str = "Index";

/// How aggressively to reconnect.
///
/// The default retries on every failed check, immediately, forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&ReconnectSection> for ReconnectPolicy {
    fn from(r: &ReconnectSection) -> Self {
        Self {
            max_attempts: r.max_attempts,
            base_delay: Duration::from_millis(r.base_delay_ms),
            max_delay: Duration::from_millis(r.max_delay_ms),
        }
    }
}

impl ReconnectPolicy {
    /// `attempt` is 1-based.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Exponential backoff: `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// What a single health check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    /// No recorded url; nothing to check.
    Idle,
    /// Round-trip completed (any non-transport result).
    Healthy { code: i32, msg: String },
    Reconnected,
    ReconnectFailed,
    /// Another reconnect is already running.
    ReconnectInFlight,
    /// `max_attempts` exhausted.
    GaveUp,
}

impl ConnectionManager {
    /// Spawn the periodic monitor. Each tick runs its check on its own task
    /// so a slow round-trip never delays the next tick.
    pub fn spawn_health_monitor(&self) -> JoinHandle<()> {
        let mgr = self.clone();
        let every = self.inner.opts.health_interval;

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick fires immediately
            tick.tick().await;

            loop {
                tick.tick().await;
                if mgr.conn_url().await.is_none() {
                    continue;
                }
                let m = mgr.clone();
                tokio::spawn(async move {
                    m.health_check().await;
                });
            }
        })
    }

    /// Run one health round-trip and react to the result.
    pub async fn health_check(&self) -> HealthOutcome {
        if self.conn_url().await.is_none() {
            return HealthOutcome::Idle;
        }

        let resp = self
            .send_text_message(HEALTH_HANDLER, HEALTH_METHOD, &unix_millis().to_string())
            .await;

        if !resp.is_failed_to_send() {
            tracing::info!(code = resp.code, msg = %resp.msg, "health check");
            return HealthOutcome::Healthy { code: resp.code, msg: resp.msg };
        }

        // re-read: a close during the round-trip turns the monitor idle
        let Some(url) = self.conn_url().await else {
            return HealthOutcome::Idle;
        };
        tracing::info!(url = %url, "health check failed, reconnecting");
        self.reconnect(&url).await
    }

    async fn reconnect(&self, url: &str) -> HealthOutcome {
        if self.inner.reconnecting.swap(true, Ordering::AcqRel) {
            return HealthOutcome::ReconnectInFlight;
        }

        let attempt = self.inner.reconnect_attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let policy = &self.inner.opts.reconnect;

        let outcome = if !policy.allows(attempt) {
            tracing::warn!(url, attempt, "reconnect attempts exhausted");
            HealthOutcome::GaveUp
        } else {
            let delay = policy.delay_for(attempt);
            if !delay.is_zero() {
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect backoff");
                tokio::time::sleep(delay).await;
            }
            match self.open(url, None).await {
                Ok(()) => HealthOutcome::Reconnected,
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "reconnect failed");
                    HealthOutcome::ReconnectFailed
                }
            }
        };

        self.inner.reconnecting.store(false, Ordering::Release);
        outcome
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
