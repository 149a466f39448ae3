//! Provider orchestrating the authorization and token endpoints.
//!
//! Each endpoint call is a single pass: build the typed request, let every
//! handler in the chain validate it, then let the chain handle it. The caller
//! gets either a complete response or exactly one error.

use std::sync::Arc;
use subtle::ConstantTimeEq;
use url::Url;

use super::{
    handlers::{AuthorizeEndpointHandlers, TokenEndpointHandlers},
    request::{AccessRequest, AuthorizeRequest, ClientCredentials, Request, RequestForm},
    response::{AccessResponse, AuthorizeResponse},
    types::{OAuthClient, Session},
};
use crate::errors::OAuthError;
use crate::storage::traits::ClientStore;

/// Shortest `state` value accepted at the authorization endpoint.
pub const MIN_STATE_LENGTH: usize = 8;

/// OAuth 2.0 provider owning the handler chains and the client registry.
#[derive(Clone)]
pub struct Provider {
    clients: Arc<dyn ClientStore>,
    authorize_handlers: AuthorizeEndpointHandlers,
    token_handlers: TokenEndpointHandlers,
}

impl Provider {
    pub fn new(
        clients: Arc<dyn ClientStore>,
        authorize_handlers: AuthorizeEndpointHandlers,
        token_handlers: TokenEndpointHandlers,
    ) -> Self {
        Self {
            clients,
            authorize_handlers,
            token_handlers,
        }
    }

    pub fn authorize_endpoint_handlers(&self) -> &AuthorizeEndpointHandlers {
        &self.authorize_handlers
    }

    pub fn token_endpoint_handlers(&self) -> &TokenEndpointHandlers {
        &self.token_handlers
    }

    /// Build an authorization request from query parameters.
    pub async fn new_authorize_request(
        &self,
        form: RequestForm,
    ) -> Result<AuthorizeRequest, OAuthError> {
        let client_id = form
            .get("client_id")
            .ok_or_else(|| OAuthError::invalid_request("client_id is required"))?;
        let client = self.get_client(client_id).await?;

        let redirect_uri = match form.get("redirect_uri") {
            Some(raw) => {
                let uri = Url::parse(raw).map_err(|e| {
                    OAuthError::invalid_request("redirect_uri is not an absolute URI").with_cause(e)
                })?;
                if !client.has_redirect_uri(&uri) {
                    return Err(OAuthError::invalid_request(
                        "redirect_uri is not registered for this client",
                    ));
                }
                uri
            }
            None => client.default_redirect_uri().ok_or_else(|| {
                OAuthError::invalid_request("redirect_uri is required for this client")
            })?,
        };

        let mut request = Request::new(form);
        request.client = Some(client);
        let mut authorize_request = AuthorizeRequest::new(request);
        authorize_request.redirect_uri = Some(redirect_uri);

        if authorize_request.response_types.is_empty() {
            return Err(OAuthError::invalid_request("response_type is required"));
        }
        match authorize_request.state.as_deref() {
            Some(state) if state.len() >= MIN_STATE_LENGTH => {}
            _ => {
                return Err(OAuthError::invalid_request(format!(
                    "state must be at least {MIN_STATE_LENGTH} characters"
                )));
            }
        }

        Ok(authorize_request)
    }

    /// Run the authorize chain for an approved request.
    pub async fn new_authorize_response(
        &self,
        request: &mut AuthorizeRequest,
        session: Session,
    ) -> Result<AuthorizeResponse, OAuthError> {
        request.request.session = session;
        let redirect_uri = request
            .redirect_uri
            .clone()
            .ok_or_else(|| OAuthError::invalid_request("redirect_uri is required"))?;

        let mut first_error = None;
        for handler in self.authorize_handlers.iter() {
            if let Err(e) = handler.validate_authorize_endpoint_request(request).await {
                tracing::debug!(handler = handler.name(), error = ?e, "authorize validation failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let mut response = AuthorizeResponse::new(redirect_uri);
        for handler in self.authorize_handlers.iter() {
            handler
                .handle_authorize_endpoint_request(request, &mut response)
                .await?;
        }

        if !request.did_handle_all_response_types() {
            return Err(OAuthError::unsupported_response_type(format!(
                "no handler for response type \"{}\"",
                request.response_types
            )));
        }
        Ok(response)
    }

    /// Build and validate a token request. Exactly one handler must claim it.
    pub async fn new_access_request(
        &self,
        form: RequestForm,
        credentials: ClientCredentials,
        session: Session,
    ) -> Result<AccessRequest, OAuthError> {
        if !form.contains("grant_type") {
            return Err(OAuthError::invalid_request("grant_type is required"));
        }
        let client = self.authenticate_client(&credentials).await?;

        let mut request = Request::new(form);
        request.client = Some(client);
        request.session = session;
        let mut access_request = AccessRequest::new(request);

        let mut first_error = None;
        for handler in self.token_handlers.iter() {
            if let Err(e) = handler
                .validate_token_endpoint_request(&mut access_request)
                .await
            {
                tracing::debug!(handler = handler.name(), error = ?e, "token validation failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        if !access_request.is_handled() {
            return Err(OAuthError::unsupported_grant_type(format!(
                "no handler for grant type \"{}\"",
                access_request.grant_types
            )));
        }
        Ok(access_request)
    }

    /// Run the token chain for a claimed request.
    pub async fn new_access_response(
        &self,
        request: &AccessRequest,
    ) -> Result<AccessResponse, OAuthError> {
        let mut response = AccessResponse::new();
        for handler in self.token_handlers.iter() {
            handler
                .handle_token_endpoint_request(request, &mut response)
                .await?;
        }

        if response.access_token().is_empty() {
            return Err(OAuthError::server_error(
                "token chain completed without issuing an access token",
            ));
        }
        Ok(response)
    }

    /// Token endpoint: [`Self::new_access_request`] then [`Self::new_access_response`].
    pub async fn token(
        &self,
        form: RequestForm,
        credentials: ClientCredentials,
        session: Session,
    ) -> Result<AccessResponse, OAuthError> {
        let request = self.new_access_request(form, credentials, session).await?;
        self.new_access_response(&request).await
    }

    async fn get_client(&self, client_id: &str) -> Result<OAuthClient, OAuthError> {
        match self.clients.get_client(client_id).await {
            Ok(Some(client)) => Ok(client),
            Ok(None) => Err(OAuthError::invalid_client(format!(
                "unknown client {client_id}"
            ))),
            Err(e) => {
                tracing::error!(error = ?e, client_id, "client lookup failed");
                Err(OAuthError::server_error("client lookup failed").with_cause(e))
            }
        }
    }

    async fn authenticate_client(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<OAuthClient, OAuthError> {
        if credentials.client_id.is_empty() {
            return Err(OAuthError::invalid_client("client_id is required"));
        }
        let client = self.get_client(&credentials.client_id).await?;
        if client.is_public() {
            return Ok(client);
        }

        let (Some(expected), Some(provided)) =
            (&client.client_secret, &credentials.client_secret)
        else {
            return Err(OAuthError::invalid_client("client secret is required"));
        };
        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            tracing::debug!(client_id = %client.client_id, "client secret mismatch");
            return Err(OAuthError::invalid_client("invalid client secret"));
        }
        Ok(client)
    }
}
