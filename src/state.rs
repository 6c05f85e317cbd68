use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::store::Store;

/// Shared by every handler through axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub security: Arc<SecurityConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, security: SecurityConfig) -> Self {
        Self {
            store,
            security: Arc::new(security),
        }
    }
}
