use async_trait::async_trait;

use wshttp_core::{SocketRequest, SocketResponse};

use crate::app_state::AppState;
use crate::channel::ConnChannel;

/// Everything a handler sees for one request.
pub struct SocketContext {
    pub channel: ConnChannel,
    pub state: AppState,
    pub request: SocketRequest,
    /// Pre-filled with the request uid; the handler completes it.
    pub response: SocketResponse,
}

impl SocketContext {
    pub fn new(channel: ConnChannel, state: AppState, request: SocketRequest) -> Self {
        let response = SocketResponse::for_request(request.uid.clone());
        Self {
            channel,
            state,
            request,
            response,
        }
    }
}

#[async_trait]
pub trait ServerHandler: Send + Sync {
    async fn handle(&self, ctx: &mut SocketContext);
}

/// Adapter for plain closures.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ServerHandler for FnHandler<F>
where
    F: Fn(&mut SocketContext) + Send + Sync,
{
    async fn handle(&self, ctx: &mut SocketContext) {
        (self.0)(ctx)
    }
}
