//! Grant handler contracts and the endpoint handler chains that drive them.

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    request::{AccessRequest, AuthorizeRequest},
    response::{AccessResponse, AuthorizeResponse},
};
use crate::errors::OAuthError;

/// A grant handler taking part in the authorization endpoint.
///
/// Both methods must return `Ok(())` without touching the request when the
/// requested response types are not the handler's own.
#[async_trait]
pub trait AuthorizeEndpointHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn validate_authorize_endpoint_request(
        &self,
        request: &mut AuthorizeRequest,
    ) -> Result<(), OAuthError>;

    async fn handle_authorize_endpoint_request(
        &self,
        request: &mut AuthorizeRequest,
        response: &mut AuthorizeResponse,
    ) -> Result<(), OAuthError>;
}

/// A grant handler taking part in the token endpoint.
///
/// `validate_token_endpoint_request` claims the request by marking its grant
/// type handled. `handle_token_endpoint_request` must do nothing unless the
/// request was claimed for this handler's grant type.
#[async_trait]
pub trait TokenEndpointHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn validate_token_endpoint_request(
        &self,
        request: &mut AccessRequest,
    ) -> Result<(), OAuthError>;

    async fn handle_token_endpoint_request(
        &self,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> Result<(), OAuthError>;
}

/// Ordered, append-only chain of authorization endpoint handlers.
#[derive(Clone, Default)]
pub struct AuthorizeEndpointHandlers(Vec<Arc<dyn AuthorizeEndpointHandler>>);

impl AuthorizeEndpointHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, handler: Arc<dyn AuthorizeEndpointHandler>) {
        self.0.push(handler);
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn AuthorizeEndpointHandler>> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AuthorizeEndpointHandler>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered, append-only chain of token endpoint handlers.
#[derive(Clone, Default)]
pub struct TokenEndpointHandlers(Vec<Arc<dyn TokenEndpointHandler>>);

impl TokenEndpointHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, handler: Arc<dyn TokenEndpointHandler>) {
        self.0.push(handler);
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn TokenEndpointHandler>> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TokenEndpointHandler>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl AuthorizeEndpointHandler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn validate_authorize_endpoint_request(
            &self,
            _request: &mut AuthorizeRequest,
        ) -> Result<(), OAuthError> {
            Ok(())
        }

        async fn handle_authorize_endpoint_request(
            &self,
            _request: &mut AuthorizeRequest,
            _response: &mut AuthorizeResponse,
        ) -> Result<(), OAuthError> {
            Ok(())
        }
    }

    #[async_trait]
    impl TokenEndpointHandler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn validate_token_endpoint_request(
            &self,
            _request: &mut AccessRequest,
        ) -> Result<(), OAuthError> {
            Ok(())
        }

        async fn handle_token_endpoint_request(
            &self,
            _request: &AccessRequest,
            _response: &mut AccessResponse,
        ) -> Result<(), OAuthError> {
            Ok(())
        }
    }

    #[test]
    fn test_authorize_endpoint_handlers_append() {
        let first: Arc<dyn AuthorizeEndpointHandler> = Arc::new(Named("first"));
        let second: Arc<dyn AuthorizeEndpointHandler> = Arc::new(Named("second"));

        let mut handlers = AuthorizeEndpointHandlers::new();
        assert!(handlers.is_empty());

        handlers.append(first.clone());
        assert_eq!(handlers.len(), 1);
        assert!(Arc::ptr_eq(handlers.get(0).unwrap(), &first));

        handlers.append(second.clone());
        assert_eq!(handlers.len(), 2);
        assert!(Arc::ptr_eq(handlers.get(0).unwrap(), &first));
        assert!(Arc::ptr_eq(handlers.get(1).unwrap(), &second));
        assert!(handlers.get(2).is_none());
    }

    #[test]
    fn test_token_endpoint_handlers_append() {
        let handler: Arc<dyn TokenEndpointHandler> = Arc::new(Named("only"));

        let mut handlers = TokenEndpointHandlers::new();
        handlers.append(handler.clone());

        assert_eq!(handlers.len(), 1);
        assert!(Arc::ptr_eq(handlers.get(0).unwrap(), &handler));
        let names: Vec<_> = handlers.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["only"]);
    }
}
