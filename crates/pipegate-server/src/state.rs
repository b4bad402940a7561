use pipegate_core::router::EventRouter;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EventRouter>,
    /// Shared secret for inbound event signatures; `None` disables the
    /// check.
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(router: Arc<EventRouter>, webhook_secret: Option<String>) -> Self {
        Self {
            router,
            webhook_secret,
        }
    }
}
