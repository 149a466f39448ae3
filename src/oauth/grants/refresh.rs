//! Refresh token grant (RFC 6749 Section 6) with rotation.

use async_trait::async_trait;
use std::sync::Arc;

use super::{generate_token, has_expired, map_storage_error, write_bearer_token};
use crate::errors::OAuthError;
use crate::oauth::{
    handlers::TokenEndpointHandler,
    request::AccessRequest,
    response::AccessResponse,
    strategy::TokenStrategy,
    types::GrantType,
};
use crate::storage::traits::RefreshTokenGrantStorage;

const GRANT_TYPE: &str = "refresh_token";

/// Exchanges a refresh token for a new access token and a new refresh token.
///
/// Every presented refresh token is revoked; a refresh token is good for
/// exactly one exchange.
pub struct RefreshTokenGrantHandler {
    pub store: Arc<dyn RefreshTokenGrantStorage>,
    pub access_token_strategy: Arc<dyn TokenStrategy>,
    pub refresh_token_strategy: Arc<dyn TokenStrategy>,
    pub access_token_lifespan: chrono::Duration,
    pub refresh_token_lifespan: chrono::Duration,
}

#[async_trait]
impl TokenEndpointHandler for RefreshTokenGrantHandler {
    fn name(&self) -> &'static str {
        "refresh_token"
    }

    async fn validate_token_endpoint_request(
        &self,
        request: &mut AccessRequest,
    ) -> Result<(), OAuthError> {
        if !request.grant_types.exact(GRANT_TYPE) {
            return Ok(());
        }

        let client_id = {
            let client = request.request.client()?;
            if !client.allows_grant_type(GrantType::RefreshToken) {
                return Err(OAuthError::unauthorized_client(
                    "client is not allowed the refresh token grant",
                ));
            }
            client.client_id.clone()
        };

        let token = request
            .request
            .form
            .get("refresh_token")
            .ok_or_else(|| OAuthError::invalid_request("refresh_token is required"))?;
        let signature = self
            .refresh_token_strategy
            .validate(token)
            .map_err(|e| OAuthError::invalid_grant("malformed refresh token").with_cause(e))?;

        let stored = self
            .store
            .get_refresh_token_session(&signature)
            .await
            .map_err(|e| {
                map_storage_error(e, || OAuthError::invalid_grant("unknown refresh token"))
            })?;

        if stored.client_id != client_id {
            tracing::warn!(
                client_id = %client_id,
                "refresh token presented by a different client"
            );
            return Err(OAuthError::invalid_grant(
                "refresh token was issued to another client",
            ));
        }
        if has_expired(stored.requested_at, self.refresh_token_lifespan) {
            return Err(OAuthError::invalid_grant("refresh token expired"));
        }

        request.request.session = stored.session;
        for scope in stored.granted_scopes.iter() {
            request.request.grant_scope(scope);
        }
        request.set_grant_type_handled(GRANT_TYPE)?;

        tracing::debug!(grant_type = GRANT_TYPE, client_id = %client_id, "token request claimed");
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

        let token = request
            .request
            .form
            .get("refresh_token")
            .ok_or_else(|| OAuthError::server_error("claimed request lost its refresh token"))?;
        let old_signature = self.refresh_token_strategy.validate(token).map_err(|e| {
            OAuthError::server_error("claimed request carries an invalid refresh token")
                .with_cause(e)
        })?;

        self.store
            .delete_refresh_token_session(&old_signature)
            .await
            .map_err(|e| {
                map_storage_error(e, || {
                    OAuthError::invalid_grant("refresh token already used")
                })
            })?;

        let session = &request.request.session;
        let access = generate_token(self.access_token_strategy.as_ref(), session, "access token")?;
        let refresh = generate_token(
            self.refresh_token_strategy.as_ref(),
            session,
            "refresh token",
        )?;

        let stored = request.request.to_stored(None);
        self.store
            .create_access_token_session(&access.signature, &stored)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to persist access token session");
                OAuthError::server_error("failed to persist access token session").with_cause(e)
            })?;
        if let Err(e) = self
            .store
            .create_refresh_token_session(&refresh.signature, &stored)
            .await
        {
            tracing::error!(error = ?e, "failed to persist refresh token session");
            if let Err(cleanup) = self
                .store
                .delete_access_token_session(&access.signature)
                .await
            {
                tracing::error!(error = ?cleanup, "failed to revoke orphaned access token");
            }
            return Err(
                OAuthError::server_error("failed to persist refresh token session").with_cause(e),
            );
        }

        write_bearer_token(
            response,
            access.token,
            self.access_token_lifespan,
            &request.request.granted_scopes,
        );
        response.set_extra("refresh_token", refresh.token);

        tracing::debug!(grant_type = GRANT_TYPE, "refresh token rotated");
        Ok(())
    }
}
