use std::sync::Arc;

use jellylink_core::{Config, LibraryMonitor, LibraryService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<LibraryService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<LibraryService>) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &LibraryService {
        self.service.as_ref()
    }

    pub fn monitor(&self) -> &LibraryMonitor {
        self.service.monitor().as_ref()
    }
}
