//! Authorization code grant (RFC 6749 Section 4.1).
//!
//! The handler takes part in both chains: the authorize endpoint issues a
//! one-time code bound to the approved request, the token endpoint exchanges
//! that code for an access token and, with the `offline` scope, a refresh
//! token.

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use super::{
    generate_token, grant_requested_scopes, has_expired, map_storage_error, write_bearer_token,
};
use crate::errors::OAuthError;
use crate::oauth::{
    handlers::{AuthorizeEndpointHandler, TokenEndpointHandler},
    request::{AccessRequest, AuthorizeRequest},
    response::{AccessResponse, AuthorizeResponse},
    strategy::TokenStrategy,
    types::{GrantType, OFFLINE_SCOPE, ResponseType},
};
use crate::storage::traits::AuthorizeExplicitGrantStorage;

const RESPONSE_TYPE: &str = "code";
const GRANT_TYPE: &str = "authorization_code";

pub struct AuthorizeExplicitGrantHandler {
    pub store: Arc<dyn AuthorizeExplicitGrantStorage>,
    pub authorize_code_strategy: Arc<dyn TokenStrategy>,
    pub access_token_strategy: Arc<dyn TokenStrategy>,
    pub refresh_token_strategy: Arc<dyn TokenStrategy>,
    pub authorize_code_lifespan: chrono::Duration,
    pub access_token_lifespan: chrono::Duration,
}

#[async_trait]
impl AuthorizeEndpointHandler for AuthorizeExplicitGrantHandler {
    fn name(&self) -> &'static str {
        "authorize_explicit"
    }

    async fn validate_authorize_endpoint_request(
        &self,
        request: &mut AuthorizeRequest,
    ) -> Result<(), OAuthError> {
        if !request.response_types.exact(RESPONSE_TYPE) {
            return Ok(());
        }

        let client = request.request.client()?;
        if !client.allows_response_type(ResponseType::Code)
            || !client.allows_grant_type(GrantType::AuthorizationCode)
        {
            return Err(OAuthError::unauthorized_client(
                "client is not allowed the authorization code grant",
            ));
        }
        if request.redirect_uri.is_none() {
            return Err(OAuthError::invalid_request("redirect_uri is required"));
        }

        grant_requested_scopes(&mut request.request)
    }

    async fn handle_authorize_endpoint_request(
        &self,
        request: &mut AuthorizeRequest,
        response: &mut AuthorizeResponse,
    ) -> Result<(), OAuthError> {
        if !request.response_types.exact(RESPONSE_TYPE) {
            return Ok(());
        }

        let code = generate_token(
            self.authorize_code_strategy.as_ref(),
            &request.request.session,
            "authorization code",
        )?;

        // Only an explicitly supplied redirect_uri has to be repeated at the token endpoint.
        let bound_redirect_uri = request
            .request
            .form
            .get("redirect_uri")
            .and(request.redirect_uri.as_ref());
        self.store
            .create_authorize_code_session(
                &code.signature,
                &request.request.to_stored(bound_redirect_uri),
            )
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to persist authorization code session");
                OAuthError::server_error("failed to persist authorization code session")
                    .with_cause(e)
            })?;

        response.add_query("code", code.token);
        if let Some(state) = &request.state {
            response.add_query("state", state.clone());
        }
        if !request.request.granted_scopes.is_empty() {
            response.add_query("scope", request.request.granted_scopes.to_space_delimited());
        }
        request.set_response_type_handled(RESPONSE_TYPE);

        tracing::debug!(
            client_id = %request.request.client()?.client_id,
            "authorization code issued"
        );
        Ok(())
    }
}

#[async_trait]
impl TokenEndpointHandler for AuthorizeExplicitGrantHandler {
    fn name(&self) -> &'static str {
        "authorize_explicit"
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
            if !client.allows_grant_type(GrantType::AuthorizationCode) {
                return Err(OAuthError::unauthorized_client(
                    "client is not allowed the authorization code grant",
                ));
            }
            client.client_id.clone()
        };

        let code = request
            .request
            .form
            .get("code")
            .ok_or_else(|| OAuthError::invalid_request("code is required"))?;
        let signature = self
            .authorize_code_strategy
            .validate(code)
            .map_err(|e| OAuthError::invalid_grant("malformed authorization code").with_cause(e))?;

        let stored = self
            .store
            .get_authorize_code_session(&signature)
            .await
            .map_err(|e| {
                map_storage_error(e, || {
                    OAuthError::invalid_grant("unknown or used authorization code")
                })
            })?;

        if stored.client_id != client_id {
            tracing::warn!(
                client_id = %client_id,
                "authorization code presented by a different client"
            );
            return Err(OAuthError::invalid_grant(
                "authorization code was issued to another client",
            ));
        }
        if has_expired(stored.requested_at, self.authorize_code_lifespan) {
            return Err(OAuthError::invalid_grant("authorization code expired"));
        }
        if let Some(expected) = &stored.redirect_uri {
            let presented = request
                .request
                .form
                .get("redirect_uri")
                .and_then(|uri| Url::parse(uri).ok());
            if presented.as_ref().map(Url::as_str) != Some(expected.as_str()) {
                return Err(OAuthError::invalid_grant(
                    "redirect_uri does not match the authorization request",
                ));
            }
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

        let code = request
            .request
            .form
            .get("code")
            .ok_or_else(|| OAuthError::server_error("claimed request lost its code"))?;
        let code_signature = self.authorize_code_strategy.validate(code).map_err(|e| {
            OAuthError::server_error("claimed request carries an invalid code").with_cause(e)
        })?;

        // One-time use: the code is consumed before any token is minted.
        self.store
            .delete_authorize_code_session(&code_signature)
            .await
            .map_err(|e| {
                map_storage_error(e, || {
                    OAuthError::invalid_grant("authorization code already used")
                })
            })?;

        let session = &request.request.session;
        let access = generate_token(self.access_token_strategy.as_ref(), session, "access token")?;
        let refresh = if request.request.granted_scopes.has(&[OFFLINE_SCOPE]) {
            Some(generate_token(
                self.refresh_token_strategy.as_ref(),
                session,
                "refresh token",
            )?)
        } else {
            None
        };

        let stored = request.request.to_stored(None);
        self.store
            .create_access_token_session(&access.signature, &stored)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to persist access token session");
                OAuthError::server_error("failed to persist access token session").with_cause(e)
            })?;

        if let Some(refresh) = &refresh {
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
                    OAuthError::server_error("failed to persist refresh token session")
                        .with_cause(e),
                );
            }
        }

        write_bearer_token(
            response,
            access.token,
            self.access_token_lifespan,
            &request.request.granted_scopes,
        );
        if let Some(refresh) = refresh {
            response.set_extra("refresh_token", refresh.token);
        }
        Ok(())
    }
}
