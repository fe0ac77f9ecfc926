use async_trait::async_trait;

use wshttp_core::{SocketRequest, SocketResponse};

/// Handles a server-initiated request by filling in `resp`.
///
/// `resp.uid` is already set to the request's uid; the handler sets
/// `code`/`msg`/`body`/`header` (and `sign` if the body should travel encoded).
#[async_trait]
pub trait ClientHandler: Send + Sync {
    async fn handle(&self, req: &SocketRequest, resp: &mut SocketResponse);
}

/// Adapter for plain closures.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ClientHandler for FnHandler<F>
where
    F: Fn(&SocketRequest, &mut SocketResponse) + Send + Sync,
{
    async fn handle(&self, req: &SocketRequest, resp: &mut SocketResponse) {
        (self.0)(req, resp)
    }
}
