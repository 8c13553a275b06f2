//! Application state for the console service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::catalog::QueryCatalog;
use crate::connection_manager::ConnectionManager;
use crate::driver::Connector;
use crate::session_store::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<SessionStore>,
    pub connections: Arc<ConnectionManager>,
    pub catalog: Arc<QueryCatalog>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, catalog: QueryCatalog, connector: Arc<dyn Connector>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(config.session_idle_timeout())),
            connections: Arc::new(ConnectionManager::new(connector, config.connect_timeout())),
            catalog: Arc::new(catalog),
            config,
        }
    }
}
