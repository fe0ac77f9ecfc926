use async_trait::async_trait;

use wshttp_core::SocketRequest;

use crate::dispatch::{ServerHandler, SocketContext};

/// `Chat/Room`: relay the message body to every named channel as a
/// server-initiated `Chat/Room` call. Delivery results are only logged.
#[derive(Default)]
pub struct ChatService;

impl ChatService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerHandler for ChatService {
    async fn handle(&self, ctx: &mut SocketContext) {
        let body = ctx.request.body.clone();
        let targets = ctx.state.channels().all();
        let fanout = targets.len();

        for ch in targets {
            let state = ctx.state.clone();
            let req = SocketRequest::call("Chat", "Room", body.clone());
            tokio::spawn(async move {
                let resp = state.send_to_channel(&ch, req).await;
                tracing::info!(channel = %ch.name(), code = resp.code, msg = %resp.msg, "chat relay result");
            });
        }

        ctx.response.msg = "success".into();
        ctx.response.header.insert("fanout".into(), fanout.to_string());
    }
}
