//! Connected channels.
//!
//! A `ConnChannel` is the handle handlers and services use to reach one
//! connection: its outbound queue, its name, and its last-activity time.
//! Named channels are indexed in the `ChannelRegistry`.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct ConnChannel {
    id: u64,
    name: Arc<str>,
    tx: mpsc::Sender<Message>,
    last_active_ms: Arc<AtomicU64>,
}

impl ConnChannel {
    pub fn new(id: u64, name: impl Into<Arc<str>>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            name: name.into(),
            tx,
            last_active_ms: Arc::new(AtomicU64::new(unix_millis())),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Empty for channels nobody named.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Refresh the activity time (the heartbeat handler does this).
    pub fn touch(&self) {
        self.last_active_ms.store(unix_millis(), Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_active_ms.load(Ordering::Relaxed);
        Duration::from_millis(unix_millis().saturating_sub(last))
    }

    pub(crate) async fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).await.is_ok()
    }

    /// Ask the session to close with `code`/`reason`. Never blocks.
    pub fn close(&self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code,
            reason: Cow::Owned(reason.to_string()),
        };
        if self.tx.try_send(Message::Close(Some(frame))).is_err() {
            tracing::debug!(channel = %self.name, id = self.id, "close on a full or finished channel");
        }
        tracing::info!(channel = %self.name, id = self.id, code, reason, "close channel");
    }
}

/// Channels by name.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: DashMap<String, ConnChannel>,
    seq: AtomicU64,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Index `ch` under its name, returning the channel it displaced.
    pub fn insert(&self, ch: ConnChannel) -> Option<ConnChannel> {
        self.channels.insert(ch.name().to_string(), ch)
    }

    /// Remove `ch` only if it is still the one registered under its name.
    pub fn remove(&self, ch: &ConnChannel) -> bool {
        self.channels
            .remove_if(ch.name(), |_, cur| cur.id() == ch.id())
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<ConnChannel> {
        self.channels.get(name).map(|r| r.value().clone())
    }

    pub fn all(&self) -> Vec<ConnChannel> {
        self.channels.iter().map(|r| r.value().clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
