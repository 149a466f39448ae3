//! Storage trait definitions for clients, token sessions, and credentials.
//!
//! Each grant handler depends on the narrow composite trait for its grant, so
//! a backend only implements what the grants it serves need. Every trait must
//! be safe for concurrent use.

use crate::errors::StorageError;
use crate::oauth::{request::StoredRequest, types::OAuthClient};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

// ===== Core Storage Traits =====

/// Trait for looking up registered OAuth clients
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Retrieve a client by ID
    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>>;
}

/// Trait for access token sessions keyed by token signature
#[async_trait]
pub trait AccessTokenStorage: Send + Sync {
    /// Persist the request that an access token was issued for
    async fn create_access_token_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()>;

    /// Retrieve an access token session, `StorageError::NotFound` if absent
    async fn get_access_token_session(&self, signature: &str) -> Result<StoredRequest>;

    /// Revoke an access token, `StorageError::NotFound` if it was already gone
    async fn delete_access_token_session(&self, signature: &str) -> Result<()>;
}

/// Trait for refresh token sessions keyed by token signature
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Persist the request that a refresh token was issued for
    async fn create_refresh_token_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()>;

    /// Retrieve a refresh token session, `StorageError::NotFound` if absent
    async fn get_refresh_token_session(&self, signature: &str) -> Result<StoredRequest>;

    /// Revoke a refresh token, `StorageError::NotFound` if it was already gone
    async fn delete_refresh_token_session(&self, signature: &str) -> Result<()>;
}

/// Trait for authorization code sessions keyed by code signature
#[async_trait]
pub trait AuthorizeCodeStorage: Send + Sync {
    /// Persist the authorization request a code was issued for
    async fn create_authorize_code_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()>;

    /// Retrieve an authorization code session, `StorageError::NotFound` if absent
    async fn get_authorize_code_session(&self, signature: &str) -> Result<StoredRequest>;

    /// Invalidate an authorization code, `StorageError::NotFound` if it was already used
    async fn delete_authorize_code_session(&self, signature: &str) -> Result<()>;
}

/// Trait for resource owner credential checks
#[async_trait]
pub trait ResourceOwnerStorage: Send + Sync {
    /// Succeed only when the credentials belong to a known resource owner.
    ///
    /// Unknown users and wrong passwords must both return
    /// `StorageError::NotFound`; any other error means the check itself failed.
    async fn authenticate(&self, username: &str, password: &str) -> Result<()>;
}

// ===== Per-Grant Storage Traits =====

/// Storage for the authorization code grant
pub trait AuthorizeExplicitGrantStorage:
    AuthorizeCodeStorage + AccessTokenStorage + RefreshTokenStorage
{
}

impl<T> AuthorizeExplicitGrantStorage for T where
    T: AuthorizeCodeStorage + AccessTokenStorage + RefreshTokenStorage
{
}

/// Storage for the implicit grant
pub trait ImplicitGrantStorage: AccessTokenStorage {}

impl<T> ImplicitGrantStorage for T where T: AccessTokenStorage {}

/// Storage for the resource owner password credentials grant
pub trait ResourceOwnerPasswordCredentialsGrantStorage:
    ResourceOwnerStorage + AccessTokenStorage
{
}

impl<T> ResourceOwnerPasswordCredentialsGrantStorage for T where
    T: ResourceOwnerStorage + AccessTokenStorage
{
}

/// Storage for the client credentials grant
pub trait ClientCredentialsGrantStorage: AccessTokenStorage {}

impl<T> ClientCredentialsGrantStorage for T where T: AccessTokenStorage {}

/// Storage for the refresh token grant
pub trait RefreshTokenGrantStorage: AccessTokenStorage + RefreshTokenStorage {}

impl<T> RefreshTokenGrantStorage for T where T: AccessTokenStorage + RefreshTokenStorage {}

// ===== Combined Storage Trait =====

/// Combined storage trait covering every grant
pub trait OAuthStorage:
    ClientStore
    + AuthorizeCodeStorage
    + AccessTokenStorage
    + RefreshTokenStorage
    + ResourceOwnerStorage
    + Send
    + Sync
{
}

impl<T> OAuthStorage for T where
    T: ClientStore
        + AuthorizeCodeStorage
        + AccessTokenStorage
        + RefreshTokenStorage
        + ResourceOwnerStorage
        + Send
        + Sync
{
}
