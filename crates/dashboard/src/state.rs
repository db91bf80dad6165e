//! Application state shared across handlers.

use std::sync::Arc;

use store::Store;

use crate::config::Config;
use crate::session::{SessionManager, SessionSettings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Backend store.
    pub store: Store,
    /// Server configuration.
    pub config: Arc<Config>,
    /// Signed-in sessions, one per browser.
    pub sessions: SessionManager,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Self {
        let sessions = SessionManager::new(
            store.clone(),
            SessionSettings {
                recent_activity_limit: config.recent_activity_limit,
                liveness_tick: config.liveness_tick,
            },
        );

        Self {
            store,
            config: Arc::new(config),
            sessions,
        }
    }
}
