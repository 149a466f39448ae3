//! Wiring every grant handler into a ready-to-serve [`Provider`].

use std::sync::Arc;

use super::{
    grants::{
        AuthorizeExplicitGrantHandler, ClientCredentialsGrantHandler, ImplicitGrantHandler,
        RefreshTokenGrantHandler, ResourceOwnerPasswordCredentialsGrantHandler,
    },
    handlers::{AuthorizeEndpointHandlers, TokenEndpointHandlers},
    provider::Provider,
    strategy::TokenStrategy,
};
use crate::storage::traits::OAuthStorage;

/// Token lifespans shared by the composed handlers.
#[derive(Clone, Debug)]
pub struct ComposeConfig {
    pub access_token_lifespan: chrono::Duration,
    pub authorize_code_lifespan: chrono::Duration,
    pub refresh_token_lifespan: chrono::Duration,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            access_token_lifespan: chrono::Duration::hours(1),
            authorize_code_lifespan: chrono::Duration::minutes(10),
            refresh_token_lifespan: chrono::Duration::days(14),
        }
    }
}

/// Build a provider serving every supported grant from one storage backend.
///
/// Handlers are appended in a fixed order: the authorization code handler in
/// both chains, implicit in the authorize chain, then password, client
/// credentials, and refresh token in the token chain.
pub fn compose_provider<S>(
    config: &ComposeConfig,
    storage: Arc<S>,
    strategy: Arc<dyn TokenStrategy>,
) -> Provider
where
    S: OAuthStorage + 'static,
{
    let explicit = Arc::new(AuthorizeExplicitGrantHandler {
        store: storage.clone(),
        authorize_code_strategy: strategy.clone(),
        access_token_strategy: strategy.clone(),
        refresh_token_strategy: strategy.clone(),
        authorize_code_lifespan: config.authorize_code_lifespan,
        access_token_lifespan: config.access_token_lifespan,
    });

    let mut authorize_handlers = AuthorizeEndpointHandlers::new();
    authorize_handlers.append(explicit.clone());
    authorize_handlers.append(Arc::new(ImplicitGrantHandler {
        store: storage.clone(),
        access_token_strategy: strategy.clone(),
        access_token_lifespan: config.access_token_lifespan,
    }));

    let mut token_handlers = TokenEndpointHandlers::new();
    token_handlers.append(explicit);
    token_handlers.append(Arc::new(ResourceOwnerPasswordCredentialsGrantHandler {
        store: storage.clone(),
        access_token_strategy: strategy.clone(),
        access_token_lifespan: config.access_token_lifespan,
    }));
    token_handlers.append(Arc::new(ClientCredentialsGrantHandler {
        store: storage.clone(),
        access_token_strategy: strategy.clone(),
        access_token_lifespan: config.access_token_lifespan,
    }));
    token_handlers.append(Arc::new(RefreshTokenGrantHandler {
        store: storage.clone(),
        access_token_strategy: strategy.clone(),
        refresh_token_strategy: strategy,
        access_token_lifespan: config.access_token_lifespan,
        refresh_token_lifespan: config.refresh_token_lifespan,
    }));

    Provider::new(storage, authorize_handlers, token_handlers)
}
