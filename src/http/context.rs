//! Application state shared by the HTTP handlers.

use axum::extract::FromRef;
use std::sync::Arc;

use crate::oauth::Provider;
use crate::storage::traits::ResourceOwnerStorage;

#[derive(Clone)]
pub struct AppState {
    /// Provider driving the authorization and token endpoints
    pub provider: Arc<Provider>,
    /// Resource owner credential checks for the authorization endpoint
    pub resource_owners: Arc<dyn ResourceOwnerStorage>,
}

impl FromRef<AppState> for Arc<Provider> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.provider.clone()
    }
}
