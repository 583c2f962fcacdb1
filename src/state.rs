use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::database::Store;

/// Shared request context, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        Self {
            tokens: TokenService::new(&config.security.jwt_secret),
            passwords: PasswordHasher::new(config.security.bcrypt_cost),
            config: Arc::new(config),
            store,
        }
    }
}
