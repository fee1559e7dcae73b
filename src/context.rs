use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::ServerRegistry;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: ServerRegistry,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: ServerRegistry::new(),
        }
    }
}
