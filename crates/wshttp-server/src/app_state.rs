//! Shared application state for the wshttp server.
//!
//! - Handler table, channel registry, and pending calls to clients
//! - Filter chains and the optional name builder, fixed at build time
//! - `send_to_channel`: server-initiated call with uid correlation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wshttp_core::protocol::envelope::{CODE_FAILED_TO_SEND, CODE_TIMEOUT, MSG_TIMEOUT};
use wshttp_core::protocol::sign;
use wshttp_core::{HandlerRegistry, PendingTable, SocketRequest, SocketResponse};

use crate::channel::{ChannelRegistry, ConnChannel};
use crate::config::ServerSection;
use crate::dispatch::{FnHandler, ServerHandler, SocketContext};
use crate::filters::{self, Filters, RequestFilter, ResponseFilter};
use crate::services::HealthService;
use crate::transport::codec;

/// `msg` of a call stopped by a server-request filter.
pub const MSG_FILTERED: &str = "filtered";

/// Derives a channel name from the upgrade query string. `None` or an empty
/// name leaves the channel unregistered.
pub type NameBuilder = Arc<dyn Fn(&HashMap<String, String>) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerSection,
    handlers: HandlerRegistry<dyn ServerHandler>,
    channels: ChannelRegistry,
    pending: PendingTable,
    filters: Filters,
    name_builder: Option<NameBuilder>,
    heartbeat: AtomicBool,
}

pub struct AppStateBuilder {
    cfg: ServerSection,
    filters: Filters,
    name_builder: Option<NameBuilder>,
    heartbeat_logs: Option<bool>,
}

impl AppStateBuilder {
    pub fn name_builder<F>(mut self, f: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Option<String> + Send + Sync + 'static,
    {
        self.name_builder = Some(Arc::new(f));
        self
    }

    pub fn client_request_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SocketRequest, &ConnChannel) -> bool + Send + Sync + 'static,
    {
        self.filters.client_request.push(Arc::new(f) as RequestFilter);
        self
    }

    pub fn client_response_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SocketResponse, &ConnChannel) -> bool + Send + Sync + 'static,
    {
        self.filters.client_response.push(Arc::new(f) as ResponseFilter);
        self
    }

    pub fn server_request_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SocketRequest, &ConnChannel) -> bool + Send + Sync + 'static,
    {
        self.filters.server_request.push(Arc::new(f) as RequestFilter);
        self
    }

    pub fn server_response_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SocketResponse, &ConnChannel) -> bool + Send + Sync + 'static,
    {
        self.filters.server_response.push(Arc::new(f) as ResponseFilter);
        self
    }

    /// Register `Health/Index` and enable idle-channel eviction.
    pub fn heartbeat(mut self, show_logs: bool) -> Self {
        self.heartbeat_logs = Some(show_logs);
        self
    }

    pub fn build(self) -> AppState {
        let state = AppState {
            inner: Arc::new(AppStateInner {
                cfg: self.cfg,
                handlers: HandlerRegistry::new(),
                channels: ChannelRegistry::new(),
                pending: PendingTable::new(),
                filters: self.filters,
                name_builder: self.name_builder,
                heartbeat: AtomicBool::new(false),
            }),
        };
        if let Some(show_logs) = self.heartbeat_logs {
            state.enable_heartbeat_handler(show_logs);
        }
        state
    }
}

impl AppState {
    pub fn builder(cfg: ServerSection) -> AppStateBuilder {
        let heartbeat_logs = cfg.heartbeat.then_some(cfg.heartbeat_logs);
        AppStateBuilder {
            cfg,
            filters: Filters::default(),
            name_builder: None,
            heartbeat_logs,
        }
    }

    pub fn new(cfg: ServerSection) -> Self {
        Self::builder(cfg).build()
    }

    pub fn cfg(&self) -> &ServerSection {
        &self.inner.cfg
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.inner.channels
    }

    pub fn filters(&self) -> &Filters {
        &self.inner.filters
    }

    pub(crate) fn pending(&self) -> &PendingTable {
        &self.inner.pending
    }

    pub fn heartbeat_enabled(&self) -> bool {
        self.inner.heartbeat.load(Ordering::Relaxed)
    }

    pub fn register_handler(&self, handler: &str, method: &str, h: Arc<dyn ServerHandler>) {
        self.inner.handlers.register(handler, method, h);
    }

    pub fn register_fn<F>(&self, handler: &str, method: &str, f: F)
    where
        F: Fn(&mut SocketContext) + Send + Sync + 'static,
    {
        self.register_handler(handler, method, Arc::new(FnHandler(f)));
    }

    pub fn handler(&self, handler: &str, method: &str) -> Option<Arc<dyn ServerHandler>> {
        self.inner.handlers.get(handler, method)
    }

    pub fn enable_heartbeat_handler(&self, show_logs: bool) {
        self.register_handler("Health", "Index", Arc::new(HealthService::new(show_logs)));
        self.inner.heartbeat.store(true, Ordering::Relaxed);
    }

    pub fn channel_name(&self, query: &HashMap<String, String>) -> Option<String> {
        let builder = self.inner.name_builder.as_ref()?;
        builder(query).filter(|n| !n.is_empty())
    }

    /// Call `request.handler/method` on a connected client.
    ///
    /// Resolves to the client's response, `{-1, "timeout"}` after the
    /// configured request timeout, `{-3, "failed_to_send"}` if the channel is
    /// gone, or `{-3, "filtered"}` if a server-request filter stopped it.
    pub async fn send_to_channel(&self, ch: &ConnChannel, mut request: SocketRequest) -> SocketResponse {
        request.body = sign::encode(&request.sign, &request.body);

        if filters::stops_request(&self.inner.filters.server_request, &mut request, ch) {
            tracing::debug!(channel = %ch.name(), uid = %request.uid, "server request filtered");
            return SocketResponse::failure(request.uid, CODE_FAILED_TO_SEND, MSG_FILTERED);
        }

        let uid = request.uid.clone();
        let call = match self.inner.pending.register(&uid) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(channel = %ch.name(), error = %e, "request not sent");
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
        if !ch.send(msg).await {
            tracing::warn!(channel = %ch.name(), uid = %uid, "send to channel failed");
            return SocketResponse::failed_to_send(uid);
        }

        let timeout = Duration::from_millis(self.inner.cfg.request_timeout_ms);
        match tokio::time::timeout(timeout, call.wait()).await {
            Ok(Some(resp)) => resp,
            Ok(None) | Err(_) => {
                tracing::debug!(channel = %ch.name(), uid = %uid, "call to channel timed out");
                SocketResponse::failure(uid, CODE_TIMEOUT, MSG_TIMEOUT)
            }
        }
    }
}
