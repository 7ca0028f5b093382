use std::sync::Arc;

use axum::extract::FromRef;
use carenest_auth::{AccessPolicy, AuthState, IdentityResolver};
use carenest_storage::DynStore;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub policy: Arc<AccessPolicy>,
    pub identity: Arc<IdentityResolver>,
}

impl AppState {
    pub fn new(store: DynStore, policy: AccessPolicy, identity: IdentityResolver) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            identity: Arc::new(identity),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.identity.clone())
    }
}
