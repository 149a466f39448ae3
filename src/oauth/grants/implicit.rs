//! Implicit grant (RFC 6749 Section 4.2).

use async_trait::async_trait;
use std::sync::Arc;

use super::{generate_token, grant_requested_scopes};
use crate::errors::OAuthError;
use crate::oauth::{
    handlers::AuthorizeEndpointHandler,
    request::AuthorizeRequest,
    response::AuthorizeResponse,
    strategy::TokenStrategy,
    types::{GrantType, ResponseType, TokenType},
};
use crate::storage::traits::ImplicitGrantStorage;

const RESPONSE_TYPE: &str = "token";

/// Issues an access token straight into the redirect fragment.
pub struct ImplicitGrantHandler {
    pub store: Arc<dyn ImplicitGrantStorage>,
    pub access_token_strategy: Arc<dyn TokenStrategy>,
    pub access_token_lifespan: chrono::Duration,
}

#[async_trait]
impl AuthorizeEndpointHandler for ImplicitGrantHandler {
    fn name(&self) -> &'static str {
        "implicit"
    }

    async fn validate_authorize_endpoint_request(
        &self,
        request: &mut AuthorizeRequest,
    ) -> Result<(), OAuthError> {
        if !request.response_types.exact(RESPONSE_TYPE) {
            return Ok(());
        }

        let client = request.request.client()?;
        if !client.allows_response_type(ResponseType::Token)
            || !client.allows_grant_type(GrantType::Implicit)
        {
            return Err(OAuthError::unauthorized_client(
                "client is not allowed the implicit grant",
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

        let access = generate_token(
            self.access_token_strategy.as_ref(),
            &request.request.session,
            "access token",
        )?;
        self.store
            .create_access_token_session(
                &access.signature,
                &request.request.to_stored(request.redirect_uri.as_ref()),
            )
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to persist access token session");
                OAuthError::server_error("failed to persist access token session").with_cause(e)
            })?;

        response.add_fragment("access_token", access.token);
        response.add_fragment("token_type", TokenType::Bearer.as_str());
        response.add_fragment(
            "expires_in",
            self.access_token_lifespan.num_seconds().to_string(),
        );
        if !request.request.granted_scopes.is_empty() {
            response.add_fragment("scope", request.request.granted_scopes.to_space_delimited());
        }
        if let Some(state) = &request.state {
            response.add_fragment("state", state.clone());
        }
        request.set_response_type_handled(RESPONSE_TYPE);

        tracing::debug!(
            client_id = %request.request.client()?.client_id,
            "implicit access token issued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::oauth::grants::testing::*;
    use crate::oauth::request::{Request, RequestForm};
    use url::Url;

    const REDIRECT: &str = "https://client.example.com/callback";

    fn handler(store: Arc<MockStorage>) -> ImplicitGrantHandler {
        ImplicitGrantHandler {
            store,
            access_token_strategy: Arc::new(FixedStrategy::new("access.asig", "asig")),
            access_token_lifespan: chrono::Duration::hours(1),
        }
    }

    fn authorize_request(response_type: &str) -> AuthorizeRequest {
        let mut request = Request::new(RequestForm::from_pairs([
            ("response_type", response_type),
            ("state", "some-state-value"),
            ("scope", "read"),
        ]));
        request.client = Some(confidential_client());
        let mut ar = AuthorizeRequest::new(request);
        ar.redirect_uri = Some(Url::parse(REDIRECT).unwrap());
        ar
    }

    #[tokio::test]
    async fn test_token_in_fragment() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store.clone());
        let mut ar = authorize_request("token");
        let mut response = AuthorizeResponse::new(Url::parse(REDIRECT).unwrap());

        handler
            .validate_authorize_endpoint_request(&mut ar)
            .await
            .unwrap();
        handler
            .handle_authorize_endpoint_request(&mut ar, &mut response)
            .await
            .unwrap();

        assert!(ar.is_response_type_handled("token"));
        assert!(response.query().is_empty());
        let fragment = response.fragment();
        assert_eq!(fragment.get("access_token").map(String::as_str), Some("access.asig"));
        assert_eq!(fragment.get("token_type").map(String::as_str), Some("bearer"));
        assert_eq!(fragment.get("expires_in").map(String::as_str), Some("3600"));
        assert_eq!(fragment.get("scope").map(String::as_str), Some("read"));
        assert_eq!(
            fragment.get("state").map(String::as_str),
            Some("some-state-value")
        );
        assert!(store.access_tokens.lock().unwrap().contains_key("asig"));
    }

    #[tokio::test]
    async fn test_rejects_client_without_implicit_grant() {
        let handler = handler(Arc::new(MockStorage::default()));
        let mut ar = authorize_request("token");
        if let Some(client) = ar.request.client.as_mut() {
            client.grant_types = vec![GrantType::AuthorizationCode];
        }

        let err = handler
            .validate_authorize_endpoint_request(&mut ar)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnauthorizedClient));
    }

    #[tokio::test]
    async fn test_ignores_code_response_type() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store.clone());
        let mut ar = authorize_request("code");
        let mut response = AuthorizeResponse::new(Url::parse(REDIRECT).unwrap());

        handler
            .validate_authorize_endpoint_request(&mut ar)
            .await
            .unwrap();
        handler
            .handle_authorize_endpoint_request(&mut ar, &mut response)
            .await
            .unwrap();
        assert!(response.fragment().is_empty());
        assert!(store.access_tokens.lock().unwrap().is_empty());
    }
}
