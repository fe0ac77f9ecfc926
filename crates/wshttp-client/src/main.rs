//! wshttp client
//!
//! - Loads `wshttp-client.yaml` (or the path given as the first argument)
//! - Registers the built-in `Echo/Ping` and `Chat/Room` handlers
//! - Opens the connection and keeps it alive with the health monitor

use tracing_subscriber::{fmt, EnvFilter};

use wshttp_client::{config, ConnectionManager, ManagerOptions, OnOpen};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wshttp-client.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");

    let manager = ConnectionManager::new(ManagerOptions::from(&cfg.client));

    manager.register_fn("Echo", "Ping", |req, resp| {
        resp.body = req.body.clone();
        resp.msg = "success".into();
    });
    manager.register_fn("Chat", "Room", |req, resp| {
        tracing::info!(body = %req.body, "chat message");
        resp.msg = "success".into();
    });

    let url = cfg.client.url.clone();
    tracing::info!(%url, "wshttp-client starting");
    let on_open: OnOpen = Box::new(|m: &ConnectionManager| {
        tracing::info!(pending = m.pending_calls(), "connected");
    });
    if let Err(e) = manager.open(&url, Some(on_open)).await {
        tracing::warn!(error = %e, "initial open failed; health monitor will retry");
    }

    let monitor = manager.spawn_health_monitor();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("signal received, shutting down");

    monitor.abort();
    manager.close(1000, "shutdown").await;
}
