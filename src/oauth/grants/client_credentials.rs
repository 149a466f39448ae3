//! Client credentials grant (RFC 6749 Section 4.4).

use async_trait::async_trait;
use std::sync::Arc;

use super::{generate_token, grant_requested_scopes, write_bearer_token};
use crate::errors::OAuthError;
use crate::oauth::{
    handlers::TokenEndpointHandler,
    request::AccessRequest,
    response::AccessResponse,
    strategy::TokenStrategy,
    types::GrantType,
};
use crate::storage::traits::ClientCredentialsGrantStorage;

const GRANT_TYPE: &str = "client_credentials";

/// Issues access tokens to confidential clients acting on their own behalf.
pub struct ClientCredentialsGrantHandler {
    pub store: Arc<dyn ClientCredentialsGrantStorage>,
    pub access_token_strategy: Arc<dyn TokenStrategy>,
    pub access_token_lifespan: chrono::Duration,
}

#[async_trait]
impl TokenEndpointHandler for ClientCredentialsGrantHandler {
    fn name(&self) -> &'static str {
        "client_credentials"
    }

    async fn validate_token_endpoint_request(
        &self,
        request: &mut AccessRequest,
    ) -> Result<(), OAuthError> {
        if !request.grant_types.exact(GRANT_TYPE) {
            return Ok(());
        }

        let client = request.request.client()?;
        if client.is_public() {
            return Err(OAuthError::invalid_client(
                "public clients may not use the client credentials grant",
            ));
        }
        if !client.allows_grant_type(GrantType::ClientCredentials) {
            return Err(OAuthError::unauthorized_client(
                "client is not allowed the client credentials grant",
            ));
        }

        grant_requested_scopes(&mut request.request)?;
        request.set_grant_type_handled(GRANT_TYPE)?;

        tracing::debug!(grant_type = GRANT_TYPE, "token request claimed");
        Ok(())
    }

    async fn handle_token_endpoint_request(
        &self,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<(), OAuthError> {
        if !request.is_grant_type_handled(GRANT_TYPE) {
            return Ok(());
        }

        let access = generate_token(
            self.access_token_strategy.as_ref(),
            &request.request.session,
            "access token",
        )?;
        self.store
            .create_access_token_session(&access.signature, &request.request.to_stored(None))
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to persist access token session");
                OAuthError::server_error("failed to persist access token session").with_cause(e)
            })?;

        write_bearer_token(
            response,
            access.token,
            self.access_token_lifespan,
            &request.request.granted_scopes,
        );
        Ok(())
    }
}
