//! Filter chains.
//!
//! Four chains, one per direction and envelope kind. Filters run in
//! registration order; the first one returning `true` stops the envelope.
//!
//! | chain           | runs on                                   | stop means               |
//! |-----------------|-------------------------------------------|--------------------------|
//! | client_request  | request from a client, before its handler | no handler, no response  |
//! | client_response | our response to a client, before writing  | response not written     |
//! | server_request  | our request to a client, before writing   | call not sent            |
//! | server_response | a client's response to our call           | pending call not resolved|

use std::sync::Arc;

use wshttp_core::{SocketRequest, SocketResponse};

use crate::channel::ConnChannel;

pub type RequestFilter = Arc<dyn Fn(&mut SocketRequest, &ConnChannel) -> bool + Send + Sync>;
pub type ResponseFilter = Arc<dyn Fn(&mut SocketResponse, &ConnChannel) -> bool + Send + Sync>;

#[derive(Default, Clone)]
pub struct Filters {
    pub client_request: Vec<RequestFilter>,
    pub client_response: Vec<ResponseFilter>,
    pub server_request: Vec<RequestFilter>,
    pub server_response: Vec<ResponseFilter>,
}

/// True if any filter stops the request.
pub fn stops_request(chain: &[RequestFilter], req: &mut SocketRequest, ch: &ConnChannel) -> bool {
    chain.iter().any(|f| f(req, ch))
}

/// True if any filter stops the response.
pub fn stops_response(chain: &[ResponseFilter], resp: &mut SocketResponse, ch: &ConnChannel) -> bool {
    chain.iter().any(|f| f(resp, ch))
}
