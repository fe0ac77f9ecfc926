//! Client session loop.
//!
//! Responsibilities:
//! - Drain the outbound queue into the socket
//! - Route inbound frames: text => handler dispatch, binary => pending call
//! - Answer pings, record close/error as a transport fault

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use wshttp_core::protocol::sign;
use wshttp_core::{SocketRequest, SocketResponse};

use crate::manager::ManagerInner;
use crate::transport::codec::{decode, encode_response, Inbound};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) async fn run_session(
    inner: Arc<ManagerInner>,
    ws: WsStream,
    out_tx: mpsc::Sender<Message>,
    mut out_rx: mpsc::Receiver<Message>,
    epoch: u64,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                let closing = matches!(m, Message::Close(_));
                if let Err(e) = ws_tx.send(m).await {
                    tracing::warn!(error = %e, "socket write failed");
                    inner.mark_faulted(epoch, "write error");
                    break;
                }
                if closing {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else {
                    inner.mark_faulted(epoch, "stream ended");
                    break;
                };
                let msg = match incoming {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "socket read failed");
                        inner.mark_faulted(epoch, "read error");
                        break;
                    }
                };

                match decode(msg) {
                    Ok(Inbound::Request(req)) => {
                        tokio::spawn(handle_request(Arc::clone(&inner), out_tx.clone(), req));
                    }
                    Ok(Inbound::Response(resp)) => complete_response(&inner, resp),
                    Ok(Inbound::Ping(payload)) => {
                        if let Err(e) = ws_tx.send(Message::Pong(payload)).await {
                            tracing::warn!(error = %e, "pong write failed");
                            inner.mark_faulted(epoch, "write error");
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => {
                        inner.mark_faulted(epoch, "closed by peer");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable frame");
                    }
                }
            }
        }
    }

    tracing::debug!(epoch, "session ended");
}

/// Response lane: hand the decoded response to whoever is still waiting.
pub(crate) fn complete_response(inner: &ManagerInner, mut resp: SocketResponse) {
    let Some(responder) = inner.pending.take(&resp.uid) else {
        tracing::info!(uid = %resp.uid, code = resp.code, "no pending call for response, dropped");
        return;
    };

    resp.body = sign::decode(&resp.sign, &resp.body);
    if !responder.resolve(resp) {
        tracing::debug!("caller left before its response arrived");
    }
}

/// Request lane: run the registered handler and answer on the binary lane.
async fn handle_request(inner: Arc<ManagerInner>, out_tx: mpsc::Sender<Message>, mut req: SocketRequest) {
    let Some(handler) = inner.handlers.get(&req.handler, &req.method) else {
        tracing::warn!(
            uid = %req.uid,
            handler = %req.handler,
            method = %req.method,
            "no handler registered, request dropped"
        );
        return;
    };

    req.body = sign::decode(&req.sign, &req.body);
    let mut resp = SocketResponse::for_request(req.uid.clone());
    handler.handle(&req, &mut resp).await;
    resp.body = sign::encode(&resp.sign, &resp.body);

    let msg = match encode_response(&resp) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(uid = %resp.uid, error = %e, "response encode failed");
            return;
        }
    };
    if out_tx.send(msg).await.is_err() {
        tracing::warn!(uid = %resp.uid, "connection gone before response was written");
    }
}
