use std::sync::Arc;

use quirofano_auth::{JwtProvider, PasswordHasher};
use quirofano_orm::Store;

/// Shared by every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: JwtProvider,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        jwt: JwtProvider,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { store, jwt, hasher }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
