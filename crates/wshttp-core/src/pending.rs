//! Pending-call table: request uid -> one-shot completion.
//!
//! Each entry resolves at most once. `Responder::resolve` consumes the
//! oneshot sender, and whoever removes the entry first (a real response via
//! [`PendingTable::take`], or the caller dropping its [`PendingCall`] on
//! timeout) wins; the other side finds nothing.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::error::{Result, WsHttpError};
use crate::protocol::envelope::SocketResponse;

#[derive(Clone, Default)]
pub struct PendingTable {
    map: Arc<DashMap<String, oneshot::Sender<SocketResponse>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `uid`. Fails if the uid is already outstanding.
    pub fn register(&self, uid: &str) -> Result<PendingCall> {
        let (tx, rx) = oneshot::channel();
        match self.map.entry(uid.to_string()) {
            Entry::Occupied(_) => return Err(WsHttpError::DuplicateUid(uid.to_string())),
            Entry::Vacant(v) => {
                v.insert(tx);
            }
        }
        Ok(PendingCall {
            uid: uid.to_string(),
            rx,
            table: self.clone(),
        })
    }

    /// Remove the entry for `uid`, handing back the only way to complete it.
    pub fn take(&self, uid: &str) -> Option<Responder> {
        self.map
            .remove(uid)
            .map(|(uid, tx)| Responder { uid, tx })
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.map.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Completion side of a pending entry, detached from the table.
#[derive(Debug)]
pub struct Responder {
    uid: String,
    tx: oneshot::Sender<SocketResponse>,
}

impl Responder {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Deliver the response. Returns false if the caller already gave up.
    pub fn resolve(self, resp: SocketResponse) -> bool {
        self.tx.send(resp).is_ok()
    }
}

/// Caller side of a pending entry. Dropping it evicts the entry.
pub struct PendingCall {
    uid: String,
    rx: oneshot::Receiver<SocketResponse>,
    table: PendingTable,
}

impl PendingCall {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Wait for the response. `None` if the entry was evicted without one.
    pub async fn wait(mut self) -> Option<SocketResponse> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.table.map.remove(&self.uid);
    }
}
