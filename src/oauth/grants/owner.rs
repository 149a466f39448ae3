//! Resource owner password credentials grant (RFC 6749 Section 4.3).

use async_trait::async_trait;
use std::sync::Arc;

use super::{generate_token, grant_requested_scopes, map_storage_error, write_bearer_token};
use crate::errors::OAuthError;
use crate::oauth::{
    handlers::TokenEndpointHandler,
    request::AccessRequest,
    response::AccessResponse,
    strategy::TokenStrategy,
    types::GrantType,
};
use crate::storage::traits::ResourceOwnerPasswordCredentialsGrantStorage;

const GRANT_TYPE: &str = "password";

/// Exchanges a resource owner's username and password for an access token.
///
/// Credential checks are delegated to storage; the handler never compares
/// secrets itself.
pub struct ResourceOwnerPasswordCredentialsGrantHandler {
    pub store: Arc<dyn ResourceOwnerPasswordCredentialsGrantStorage>,
    pub access_token_strategy: Arc<dyn TokenStrategy>,
    pub access_token_lifespan: chrono::Duration,
}

#[async_trait]
impl TokenEndpointHandler for ResourceOwnerPasswordCredentialsGrantHandler {
    fn name(&self) -> &'static str {
        "resource_owner_password_credentials"
    }

    async fn validate_token_endpoint_request(
        &self,
        request: &mut AccessRequest,
    ) -> Result<(), OAuthError> {
        if !request.grant_types.exact(GRANT_TYPE) {
            return Ok(());
        }

        let form = &request.request.form;
        let (Some(username), Some(password)) = (form.get("username"), form.get("password"))
        else {
            return Err(OAuthError::invalid_request(
                "username and password are required",
            ));
        };
        let (username, password) = (username.to_string(), password.to_string());

        if !request
            .request
            .client()?
            .allows_grant_type(GrantType::Password)
        {
            return Err(OAuthError::unauthorized_client(
                "client is not allowed the password grant",
            ));
        }

        if let Err(e) = self.store.authenticate(&username, &password).await {
            tracing::debug!(error = ?e, "resource owner authentication failed");
            return Err(map_storage_error(e, || {
                OAuthError::invalid_request("invalid resource owner credentials")
            }));
        }

        grant_requested_scopes(&mut request.request)?;

        request.request.form.remove("username");
        request.request.form.remove("password");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, StorageError};
    use crate::oauth::arguments::Arguments;
    use crate::oauth::grants::testing::*;
    use crate::oauth::request::{Request, RequestForm};

    fn handler(store: Arc<MockStorage>) -> ResourceOwnerPasswordCredentialsGrantHandler {
        ResourceOwnerPasswordCredentialsGrantHandler {
            store,
            access_token_strategy: Arc::new(FixedStrategy::new("tokenfoo.bar", "bar")),
            access_token_lifespan: chrono::Duration::hours(1),
        }
    }

    fn access_request(pairs: &[(&str, &str)]) -> AccessRequest {
        let mut request = Request::new(RequestForm::from_pairs(pairs.iter().copied()));
        request.client = Some(confidential_client());
        AccessRequest::new(request)
    }

    #[tokio::test]
    async fn test_validate_ignores_other_grant_types() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store);

        let mut request = access_request(&[]);
        request.grant_types = Arguments::from(vec![String::new()]);
        handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap();
        assert!(!request.is_handled());

        let mut request = access_request(&[("grant_type", "password"), ("grant_type", "x")]);
        handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap();
        assert!(!request.is_handled());
    }

    #[tokio::test]
    async fn test_validate_requires_username_and_password() {
        let handler = handler(Arc::new(MockStorage::default()));

        let mut request = access_request(&[("grant_type", "password"), ("username", "peter")]);
        let err = handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));

        let mut request = access_request(&[("grant_type", "password"), ("password", "pan")]);
        let err = handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));
        assert!(!request.is_handled());
    }

    #[tokio::test]
    async fn test_validate_maps_storage_errors() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store.clone());
        let pairs = [
            ("grant_type", "password"),
            ("username", "peter"),
            ("password", "pan"),
        ];

        *store.authenticate_result.lock().unwrap() =
            Some(StorageError::NotFound("no such user".to_string()));
        let mut request = access_request(&pairs);
        let err = handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));

        *store.authenticate_result.lock().unwrap() =
            Some(StorageError::QueryFailed("connection reset".to_string()));
        let mut request = access_request(&pairs);
        let err = handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::ServerError));
        assert!(!request.is_handled());
    }

    #[tokio::test]
    async fn test_validate_claims_and_strips_credentials() {
        let handler = handler(Arc::new(MockStorage::default()));
        let mut request = access_request(&[
            ("grant_type", "password"),
            ("username", "peter"),
            ("password", "pan"),
            ("scope", "read"),
        ]);

        handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap();
        assert!(request.is_grant_type_handled("password"));
        assert!(!request.request.form.contains("username"));
        assert!(!request.request.form.contains("password"));
        assert!(request.request.granted_scopes.has(&["read"]));
    }

    #[tokio::test]
    async fn test_validate_rejects_unregistered_scope() {
        let handler = handler(Arc::new(MockStorage::default()));
        let mut request = access_request(&[
            ("grant_type", "password"),
            ("username", "peter"),
            ("password", "pan"),
            ("scope", "admin"),
        ]);

        let err = handler
            .validate_token_endpoint_request(&mut request)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidScope));
    }

    #[tokio::test]
    async fn test_handle_ignores_unclaimed_request() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store.clone());
        let request = access_request(&[("grant_type", "password")]);
        let mut response = AccessResponse::new();

        handler
            .handle_token_endpoint_request(&request, &mut response)
            .await
            .unwrap();
        assert_eq!(response, AccessResponse::new());
        assert!(store.access_tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_storage_failure_issues_nothing() {
        let store = Arc::new(MockStorage {
            fail_access_writes: true,
            ..Default::default()
        });
        let handler = handler(store);
        let mut request = access_request(&[("grant_type", "password")]);
        request.set_grant_type_handled("password").unwrap();
        let mut response = AccessResponse::new();

        let err = handler
            .handle_token_endpoint_request(&request, &mut response)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::ServerError));
        assert!(response.access_token().is_empty());
    }

    #[tokio::test]
    async fn test_handle_issues_access_token() {
        let store = Arc::new(MockStorage::default());
        let handler = handler(store.clone());
        let mut request = access_request(&[("grant_type", "password")]);
        request.set_grant_type_handled("password").unwrap();
        let mut response = AccessResponse::new();

        handler
            .handle_token_endpoint_request(&request, &mut response)
            .await
            .unwrap();
        assert_eq!(response.access_token(), "tokenfoo.bar");
        assert_eq!(response.extra("expires_in"), Some(&3600.into()));
        assert!(store.access_tokens.lock().unwrap().contains_key("bar"));
    }
}
