//! wshttp server library entry.
//!
//! The server side of the protocol: accepts WebSocket connections, answers
//! text-lane requests through registered handlers on the binary lane, and
//! issues its own calls to connected channels with uid correlation. It is
//! consumed by the binary (`main.rs`) and by integration tests, which drive
//! it with the client `ConnectionManager`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod filters;
pub mod router;
pub mod services;
pub mod transport;

pub use app_state::{AppState, AppStateBuilder};
pub use channel::{ChannelRegistry, ConnChannel};
pub use dispatch::{ServerHandler, SocketContext};
