use std::sync::Arc;

use sso_core::IdentityCore;
use sso_shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub core: IdentityCore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(core: IdentityCore, config: AppConfig) -> Self {
        Self { core, config: Arc::new(config) }
    }
}
