use std::sync::Arc;

use db::DBService;
use utils_jwt::TokenSigner;

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

use config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: Arc<ApiConfig>,
    signer: TokenSigner,
}

impl AppState {
    pub fn new(db: DBService, config: ApiConfig) -> Self {
        let signer = TokenSigner::new(config.jwt_secret.as_bytes(), config.token_ttl);
        Self {
            db,
            config: Arc::new(config),
            signer,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}
