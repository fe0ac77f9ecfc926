//! Axum router wiring (HTTP -> WS upgrade).
//!
//! Exposes the configured path (default `/websocket/http`) for upgrades.

use axum::{routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    let path = state.cfg().path.clone();
    Router::new()
        .route(&path, get(transport::ws::ws_upgrade))
        .with_state(state)
}
