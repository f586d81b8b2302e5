//! Shared application state

use std::sync::Arc;

use crate::config::HttpOptions;
use crate::server::TodoMcpServer;
use crate::session::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Live client sessions
    pub sessions: Arc<SessionRegistry>,
    /// Tools, resources and prompts
    pub server: Arc<TodoMcpServer>,
    /// Per-request HTTP behavior
    pub options: HttpOptions,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        server: Arc<TodoMcpServer>,
        options: HttpOptions,
    ) -> Self {
        Self {
            sessions,
            server,
            options,
        }
    }
}
