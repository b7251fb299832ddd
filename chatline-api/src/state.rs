//! Server state shared across requests

use crate::session::SessionManager;
use chatline_core::{ChatService, ShutdownCoordinator};
use std::sync::Arc;
use std::time::Duration;

/// Stream settings taken from `[server]`
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub keep_alive_interval: Duration,
    pub buffer: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub service: ChatService,
    pub sessions: Arc<SessionManager>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub stream: StreamSettings,
}

impl AppState {
    pub fn new(
        service: ChatService,
        shutdown: Arc<ShutdownCoordinator>,
        stream: StreamSettings,
    ) -> Self {
        Self {
            service,
            sessions: Arc::new(SessionManager::new()),
            shutdown,
            stream,
        }
    }
}
