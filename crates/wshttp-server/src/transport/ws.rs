//! WebSocket session.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and name the channel from the query string
//! - Replace an older channel of the same name (closed with `repetition_conn`)
//! - Text lane: run the handler and answer on the binary lane
//! - Binary lane: resolve pending `send_to_channel` calls
//! - Lifecycle: ping/pong, and idle close when heartbeat is enabled

use std::borrow::Cow;
use std::collections::HashMap;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::Instrument;

use wshttp_core::protocol::envelope::{CODE_BAD_REQUEST, MSG_BAD_REQUEST};
use wshttp_core::protocol::sign;
use wshttp_core::{SocketRequest, SocketResponse};

use crate::app_state::AppState;
use crate::channel::ConnChannel;
use crate::dispatch::SocketContext;
use crate::filters;
use crate::transport::codec::{decode, encode_response, frame_len, frame_kind, Inbound};

/// Close reason sent to a channel displaced by a newer one with its name.
pub const REASON_REPLACED: &str = "repetition_conn";
/// Close reason sent to a channel that stopped heartbeating.
pub const REASON_IDLE: &str = "timeout";

const IDLE_CHECK_EVERY: Duration = Duration::from_millis(250);

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    ws.on_upgrade(move |socket| run_session(app, q, socket))
}

async fn run_session(app: AppState, q: HashMap<String, String>, socket: WebSocket) {
    let (out_tx, out_rx) = mpsc::channel::<Message>(app.cfg().outbound_queue.max(1));

    let name = app.channel_name(&q);
    let ch = ConnChannel::new(app.channels().next_id(), name.clone().unwrap_or_default(), out_tx);
    if name.is_some() {
        if let Some(prev) = app.channels().insert(ch.clone()) {
            prev.close(1000, REASON_REPLACED);
        }
    }

    let span = tracing::info_span!("session", channel = %ch.name(), id = ch.id());
    async move {
        tracing::info!("channel open");
        session_loop(&app, &ch, out_rx, socket).await;
        if name.is_some() {
            app.channels().remove(&ch);
        }
        tracing::info!("channel closed");
    }
    .instrument(span)
    .await
}

async fn session_loop(app: &AppState, ch: &ConnChannel, mut out_rx: mpsc::Receiver<Message>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let cfg = app.cfg();
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);
    let max_frame = cfg.max_frame_bytes;

    let mut idle_tick = tokio::time::interval(IDLE_CHECK_EVERY);
    idle_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let heartbeat = app.heartbeat_enabled();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                let closing = matches!(m, Message::Close(_));
                if ws_tx.send(m).await.is_err() || closing {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };

                let len = frame_len(&msg);
                if len > max_frame {
                    tracing::warn!(len, max_frame, "oversized frame dropped");
                    continue;
                }

                let kind = frame_kind(&msg);
                match decode(msg) {
                    Ok(Inbound::Request(req)) => {
                        tokio::spawn(handle_request(app.clone(), ch.clone(), req).in_current_span());
                    }
                    Ok(Inbound::Response(resp)) => complete_response(app, ch, resp),
                    Ok(Inbound::Ping(payload)) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, code = e.code(), "undecodable frame");
                        if kind.is_some_and(|k| k.is_request()) {
                            let reply = SocketResponse::failure("", CODE_BAD_REQUEST, MSG_BAD_REQUEST);
                            if let Ok(m) = encode_response(&reply) {
                                if ws_tx.send(m).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }

            // idle close
            _ = idle_tick.tick(), if heartbeat => {
                if ch.idle_for() >= idle_timeout {
                    tracing::warn!(idle_ms = ch.idle_for().as_millis() as u64, "channel idle, closing");
                    let frame = CloseFrame { code: 1000, reason: Cow::Borrowed(REASON_IDLE) };
                    if ws_tx.send(Message::Close(Some(frame))).await.is_err() {
                        tracing::debug!("socket gone before idle close");
                    }
                    break;
                }
            }
        }
    }
}

/// Text lane: client-request filters, handler, client-response filters,
/// then the answer on the binary lane. An unknown handler still gets the
/// blank response so the caller does not wait for its timeout.
async fn handle_request(app: AppState, ch: ConnChannel, mut req: SocketRequest) {
    req.body = sign::decode(&req.sign, &req.body);

    if filters::stops_request(&app.filters().client_request, &mut req, &ch) {
        tracing::debug!(uid = %req.uid, handler = %req.handler, method = %req.method, "client request filtered");
        return;
    }

    let handler = app.handler(&req.handler, &req.method);
    let mut ctx = SocketContext::new(ch.clone(), app.clone(), req);
    match handler {
        Some(h) => h.handle(&mut ctx).await,
        None => tracing::warn!(
            handler = %ctx.request.handler,
            method = %ctx.request.method,
            "no handler registered"
        ),
    }

    let mut resp = ctx.response;
    if filters::stops_response(&app.filters().client_response, &mut resp, &ch) {
        tracing::debug!(uid = %resp.uid, "client response filtered");
        return;
    }

    resp.body = sign::encode(&resp.sign, &resp.body);
    match encode_response(&resp) {
        Ok(m) => {
            if !ch.send(m).await {
                tracing::debug!(uid = %resp.uid, "channel gone before response");
            }
        }
        Err(e) => tracing::error!(uid = %resp.uid, error = %e, "response encode failed"),
    }
}

/// Binary lane: resolve the matching `send_to_channel` call.
fn complete_response(app: &AppState, ch: &ConnChannel, mut resp: SocketResponse) {
    if filters::stops_response(&app.filters().server_response, &mut resp, ch) {
        tracing::debug!(uid = %resp.uid, "server response filtered");
        return;
    }

    let Some(responder) = app.pending().take(&resp.uid) else {
        tracing::info!(uid = %resp.uid, "no pending call for response, dropped");
        return;
    };
    resp.body = sign::decode(&resp.sign, &resp.body);
    if !responder.resolve(resp) {
        tracing::debug!("caller gone before response");
    }
}
