//! Handler table: `(handler, method)` -> handler object.
//!
//! Generic over the handler trait object so the client and server can keep
//! their own handler signatures while sharing the lookup rules.

use std::sync::Arc;

use dashmap::DashMap;

/// Key form used on both peers: `handler@method`.
pub fn handler_key(handler: &str, method: &str) -> String {
    format!("{handler}@{method}")
}

pub struct HandlerRegistry<H: ?Sized> {
    map: DashMap<String, Arc<H>>,
}

impl<H: ?Sized> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self { map: DashMap::new() }
    }
}

impl<H: ?Sized> HandlerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `(handler, method)`.
    pub fn register(&self, handler: &str, method: &str, h: Arc<H>) {
        if self.map.insert(handler_key(handler, method), h).is_some() {
            tracing::warn!(handler, method, "handler replaced");
        }
    }

    pub fn get(&self, handler: &str, method: &str) -> Option<Arc<H>> {
        self.map
            .get(&handler_key(handler, method))
            .map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, handler: &str, method: &str) -> bool {
        self.map.contains_key(&handler_key(handler, method))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}
