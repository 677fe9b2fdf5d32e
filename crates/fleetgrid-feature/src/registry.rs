//! Name-keyed table of feature handlers.
//!
//! The registry maps a feature name to the handler instance driving it.
//! It is populated at process start and read-only after being shared:
//! registration takes `&mut self`, lookups take `&self`, so the type
//! system rules out registration racing a lookup once the registry is
//! behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use fleetgrid_core::FeatureHandler;
use tracing::debug;

/// Registry of feature handlers, keyed by feature name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FeatureHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a feature name. Last registration wins.
    pub fn register(&mut self, feature_name: &str, handler: Arc<dyn FeatureHandler>) {
        debug!(feature = %feature_name, "feature handler registered");
        self.handlers.insert(feature_name.to_string(), handler);
    }

    /// Look up the handler for a feature name.
    pub fn get(&self, feature_name: &str) -> Option<Arc<dyn FeatureHandler>> {
        self.handlers.get(feature_name).cloned()
    }

    /// Names with a registered handler.
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
