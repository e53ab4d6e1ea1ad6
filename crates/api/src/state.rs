//! Application state

use std::sync::Arc;

use inkwell_shared::BlobStore;

use crate::{
    auth::{AuthState, JwtManager, SessionService},
    config::Config,
    store::Stores,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub stores: Stores,
    pub sessions: SessionService,
    /// Uploaded images
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, blobs: Arc<dyn BlobStore>) -> Self {
        let jwt_manager = JwtManager::new(&config.access_secret, &config.refresh_secret);
        let sessions = SessionService::new(
            stores.users.clone(),
            stores.refresh_tokens.clone(),
            jwt_manager.clone(),
        );

        Self {
            config,
            jwt_manager,
            stores,
            sessions,
            blobs,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
