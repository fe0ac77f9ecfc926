//! Top-level facade crate for wshttp.
//!
//! Re-exports the wire types, the client `ConnectionManager`, and the server
//! library so users can depend on a single crate.

pub mod core {
    pub use wshttp_core::*;
}

pub mod client {
    pub use wshttp_client::*;
}

pub mod server {
    pub use wshttp_server::*;
}
