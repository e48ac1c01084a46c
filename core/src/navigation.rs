//! Hook for moving the active view, used when the session is torn down.

use std::sync::{Arc, Mutex};

/// Route the client sends the user to after an authentication failure.
pub const LOGIN_ROUTE: &str = "/login";

pub trait Navigator {
    fn redirect(&self, route: &str);
}

/// Discards redirects; for hosts without a view layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect(&self, _route: &str) {}
}

/// Records every redirect. Clones share the history.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.routes().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route.to_string());
        }
    }
}
