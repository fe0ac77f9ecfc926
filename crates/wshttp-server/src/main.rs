//! wshttp server
//!
//! - WebSocket endpoint: `server.path` (default `/websocket/http`), `?name=` names the channel
//! - Text lane requests are answered on the binary lane
//! - `Health/Index` heartbeat and idle close when `server.heartbeat` is set
//! - `Chat/Room` relays to every named channel

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use wshttp_server::services::ChatService;
use wshttp_server::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wshttp-server.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .expect("server.listen must be a valid SocketAddr");

    let state = app_state::AppState::builder(cfg.server)
        .name_builder(|q| q.get("name").cloned())
        .build();
    state.register_handler("Chat", "Room", std::sync::Arc::new(ChatService::new()));

    let app = router::build_router(state);

    tracing::info!(%listen, "wshttp-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("signal received, shutting down");
        })
        .await
        .expect("server failed");
}
