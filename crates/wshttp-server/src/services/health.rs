use async_trait::async_trait;

use crate::dispatch::{ServerHandler, SocketContext};

/// `Health/Index`: refresh the channel's activity time and report success.
pub struct HealthService {
    show_logs: bool,
}

impl HealthService {
    pub fn new(show_logs: bool) -> Self {
        Self { show_logs }
    }
}

#[async_trait]
impl ServerHandler for HealthService {
    async fn handle(&self, ctx: &mut SocketContext) {
        ctx.channel.touch();
        ctx.response.code = 0;
        ctx.response.msg = "success".into();
        if self.show_logs {
            tracing::info!(channel = %ctx.channel.name(), body = %ctx.request.body, "health");
        }
    }
}
