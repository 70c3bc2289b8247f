//! Application state management.

use std::sync::Arc;

use crate::domain::{ChainClient, StateStore};

use super::service::RelayerService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RelayerService>,
    pub store: Arc<dyn StateStore>,
    pub chain: Arc<dyn ChainClient>,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, chain: Arc<dyn ChainClient>) -> Self {
        let service = Arc::new(RelayerService::new(Arc::clone(&store), Arc::clone(&chain)));
        Self {
            service,
            store,
            chain,
        }
    }
}
