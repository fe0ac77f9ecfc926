//! Connection manager: one socket, two call directions.
//!
//! Outbound calls register a pending entry keyed by uid and wait for the
//! binary response, the timeout, or an immediate synthetic failure when the
//! connection is known to be faulted. Inbound text frames are routed to the
//! handler table and answered on the binary lane (see `transport::session`).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use wshttp_core::error::{Result, WsHttpError};
use wshttp_core::protocol::sign;
use wshttp_core::{HandlerRegistry, PendingTable, SocketRequest, SocketResponse};

use crate::config::ClientSection;
use crate::dispatch::{ClientHandler, FnHandler};
use crate::health::ReconnectPolicy;
use crate::transport::{codec, session};

/// Called once the socket is open.
pub type OnOpen = Box<dyn FnOnce(&ConnectionManager) + Send>;

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Timeout used by `send_text_message` and health checks.
    pub request_timeout: Duration,
    pub health_interval: Duration,
    pub outbound_queue: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from(&ClientSection::default())
    }
}

impl From<&ClientSection> for ManagerOptions {
    fn from(c: &ClientSection) -> Self {
        Self {
            request_timeout: Duration::from_millis(c.request_timeout_ms),
            health_interval: Duration::from_millis(c.health_interval_ms),
            outbound_queue: c.outbound_queue,
            reconnect: ReconnectPolicy::from(&c.reconnect),
        }
    }
}

/// Handle to one managed connection. Clones share state; separately
/// constructed managers share nothing.
#[derive(Clone)]
pub struct ConnectionManager {
    pub(crate) inner: Arc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    pub(crate) opts: ManagerOptions,
    link: Mutex<Option<Link>>,
    conn_url: Mutex<Option<String>>,
    open_lock: Mutex<()>,
    pub(crate) faulted: AtomicBool,
    epoch: AtomicU64,
    pub(crate) pending: PendingTable,
    pub(crate) handlers: HandlerRegistry<dyn ClientHandler>,
    pub(crate) reconnect_attempts: AtomicU32,
    pub(crate) reconnecting: AtomicBool,
}

struct Link {
    epoch: u64,
    out_tx: mpsc::Sender<Message>,
    task: JoinHandle<()>,
}

impl ManagerInner {
    /// Record a transport fault, unless it comes from a superseded connection.
    pub(crate) fn mark_faulted(&self, epoch: u64, what: &str) {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.faulted.store(true, Ordering::SeqCst);
            tracing::warn!(epoch, what, "connection faulted");
        } else {
            tracing::debug!(epoch, what, "stale connection ended");
        }
    }
}

impl ConnectionManager {
    pub fn new(opts: ManagerOptions) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                opts,
                link: Mutex::new(None),
                conn_url: Mutex::new(None),
                open_lock: Mutex::new(()),
                faulted: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                pending: PendingTable::new(),
                handlers: HandlerRegistry::new(),
                reconnect_attempts: AtomicU32::new(0),
                reconnecting: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.inner.opts
    }

    /// Connect to `url`, replacing any current connection.
    ///
    /// The url is recorded before connecting, so a failed open still leaves
    /// the health monitor something to retry.
    pub async fn open(&self, url: &str, on_open: Option<OnOpen>) -> Result<()> {
        let _guard = self.inner.open_lock.lock().await;

        *self.inner.conn_url.lock().await = Some(url.to_string());
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(old) = self.inner.link.lock().await.take() {
            tracing::debug!(old_epoch = old.epoch, "dropping previous connection");
            old.task.abort();
        }

        let ws = match connect_async(url).await {
            Ok((ws, _resp)) => ws,
            Err(e) => {
                self.inner.mark_faulted(epoch, "connect failed");
                tracing::warn!(url, error = %e, "open failed");
                return Err(WsHttpError::Transport(format!("connect {url} failed: {e}")));
            }
        };

        let mut link = self.inner.link.lock().await;
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            // closed while the handshake was in flight
            drop(link);
            tracing::info!(url, epoch, "connection closed during open, dropped");
            return Err(WsHttpError::Transport(format!("connection to {url} closed during open")));
        }

        self.inner.faulted.store(false, Ordering::SeqCst);
        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);

        let (out_tx, out_rx) = mpsc::channel::<Message>(self.inner.opts.outbound_queue.max(1));
        let task = tokio::spawn(session::run_session(
            Arc::clone(&self.inner),
            ws,
            out_tx.clone(),
            out_rx,
            epoch,
        ));
        *link = Some(Link { epoch, out_tx, task });
        drop(link);
        tracing::info!(url, epoch, "connection open");

        if let Some(cb) = on_open {
            cb(self);
        }
        Ok(())
    }

    /// Close the active connection and forget its url.
    ///
    /// An `open` still in its handshake when this runs returns an error and
    /// leaves no connection behind.
    pub async fn close(&self, code: u16, reason: &str) {
        *self.inner.conn_url.lock().await = None;
        let link = {
            let mut guard = self.inner.link.lock().await;
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.inner.faulted.store(true, Ordering::SeqCst);
            guard.take()
        };

        let Some(link) = link else {
            tracing::debug!("close without a connection");
            return;
        };

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        if link.out_tx.send(Message::Close(Some(frame))).await.is_err() {
            tracing::debug!(epoch = link.epoch, "session already gone at close");
        }
        tracing::info!(code, reason, epoch = link.epoch, "connection closed");
    }

    /// Known-broken transport; sends fail immediately while set.
    pub fn is_faulted(&self) -> bool {
        self.inner.faulted.load(Ordering::SeqCst)
    }

    /// Whether an outbound handle exists.
    pub async fn is_connected(&self) -> bool {
        self.inner.link.lock().await.is_some()
    }

    /// Url of the last `open`, until `close`.
    pub async fn conn_url(&self) -> Option<String> {
        self.inner.conn_url.lock().await.clone()
    }

    /// Number of calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn register_handler(&self, handler: &str, method: &str, h: Arc<dyn ClientHandler>) {
        self.inner.handlers.register(handler, method, h);
    }

    pub fn register_fn<F>(&self, handler: &str, method: &str, f: F)
    where
        F: Fn(&SocketRequest, &mut SocketResponse) + Send + Sync + 'static,
    {
        self.register_handler(handler, method, Arc::new(FnHandler(f)));
    }

    /// Call `handler.method` with a fresh uid, `sign = "none"` and the
    /// configured request timeout.
    pub async fn send_text_message(&self, handler: &str, method: &str, body: &str) -> SocketResponse {
        let req = SocketRequest::call(handler, method, body);
        self.send_request_message(req, self.inner.opts.request_timeout).await
    }

    /// Send `request` and wait for its response.
    ///
    /// Resolves exactly once: with the genuine response (body decoded per its
    /// sign), or with `{-3, "failed_to_send"}` when the connection is faulted
    /// or absent (immediately), the write fails, or `timeout` elapses.
    pub async fn send_request_message(&self, mut request: SocketRequest, timeout: Duration) -> SocketResponse {
        request.body = sign::encode(&request.sign, &request.body);
        let uid = request.uid.clone();

        let call = match self.inner.pending.register(&uid) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "request not sent");
                return SocketResponse::failed_to_send(uid);
            }
        };

        if self.is_faulted() {
            tracing::debug!(uid = %uid, handler = %request.handler, "connection faulted, failing fast");
            return SocketResponse::failed_to_send(uid);
        }

        let out_tx = match self.inner.link.lock().await.as_ref() {
            Some(link) => link.out_tx.clone(),
            None => {
                tracing::debug!(uid = %uid, "no connection, failing fast");
                return SocketResponse::failed_to_send(uid);
            }
        };

        let msg = match codec::encode_request(&request) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "request encode failed");
                return SocketResponse::failed_to_send(uid);
            }
        };

        if out_tx.send(msg).await.is_err() {
            tracing::warn!(uid = %uid, "outbound queue closed");
            return SocketResponse::failed_to_send(uid);
        }

        match tokio::time::timeout(timeout, call.wait()).await {
            Ok(Some(resp)) => resp,
            Ok(None) | Err(_) => {
                tracing::debug!(uid = %uid, timeout_ms = timeout.as_millis() as u64, "request timed out");
                SocketResponse::failed_to_send(uid)
            }
        }
    }
}
