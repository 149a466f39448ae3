//! In-memory OAuth storage implementation
//!
//! This module provides in-memory implementations for every OAuth storage trait.

use crate::errors::StorageError;
use crate::oauth::{request::StoredRequest, types::OAuthClient};
use crate::storage::traits::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use subtle::ConstantTimeEq;

pub type Result<T> = std::result::Result<T, StorageError>;

/// In-memory implementation for OAuth storage
#[derive(Default)]
pub struct MemoryOAuthStorage {
    clients: Mutex<HashMap<String, OAuthClient>>,
    users: Mutex<HashMap<String, String>>, // username -> password
    access_tokens: Mutex<HashMap<String, StoredRequest>>,
    refresh_tokens: Mutex<HashMap<String, StoredRequest>>,
    authorize_codes: Mutex<HashMap<String, StoredRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::SerializationFailed(format!("Lock error: {}", e)))
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a client
    pub fn store_client(&self, client: OAuthClient) -> Result<()> {
        lock(&self.clients)?.insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Register or replace a resource owner
    pub fn store_user(&self, username: &str, password: &str) -> Result<()> {
        lock(&self.users)?.insert(username.to_string(), password.to_string());
        Ok(())
    }

    /// Number of live access token sessions
    pub fn access_token_count(&self) -> Result<usize> {
        Ok(lock(&self.access_tokens)?.len())
    }

    /// Number of live refresh token sessions
    pub fn refresh_token_count(&self) -> Result<usize> {
        Ok(lock(&self.refresh_tokens)?.len())
    }
}

#[async_trait]
impl ClientStore for MemoryOAuthStorage {
    async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        Ok(lock(&self.clients)?.get(client_id).cloned())
    }
}

#[async_trait]
impl ResourceOwnerStorage for MemoryOAuthStorage {
    async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        let users = lock(&self.users)?;
        match users.get(username) {
            Some(stored) if bool::from(stored.as_bytes().ct_eq(password.as_bytes())) => Ok(()),
            _ => Err(StorageError::NotFound(
                "Invalid resource owner credentials".to_string(),
            )),
        }
    }
}

#[async_trait]
impl AccessTokenStorage for MemoryOAuthStorage {
    async fn create_access_token_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()> {
        lock(&self.access_tokens)?.insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_access_token_session(&self, signature: &str) -> Result<StoredRequest> {
        lock(&self.access_tokens)?
            .get(signature)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("Access token not found".to_string()))
    }

    async fn delete_access_token_session(&self, signature: &str) -> Result<()> {
        lock(&self.access_tokens)?
            .remove(signature)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound("Access token not found".to_string()))
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryOAuthStorage {
    async fn create_refresh_token_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()> {
        lock(&self.refresh_tokens)?.insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_refresh_token_session(&self, signature: &str) -> Result<StoredRequest> {
        lock(&self.refresh_tokens)?
            .get(signature)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("Refresh token not found".to_string()))
    }

    async fn delete_refresh_token_session(&self, signature: &str) -> Result<()> {
        lock(&self.refresh_tokens)?
            .remove(signature)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound("Refresh token not found".to_string()))
    }
}

#[async_trait]
impl AuthorizeCodeStorage for MemoryOAuthStorage {
    async fn create_authorize_code_session(
        &self,
        signature: &str,
        request: &StoredRequest,
    ) -> Result<()> {
        lock(&self.authorize_codes)?.insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_authorize_code_session(&self, signature: &str) -> Result<StoredRequest> {
        lock(&self.authorize_codes)?
            .get(signature)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("Authorization code not found".to_string()))
    }

    async fn delete_authorize_code_session(&self, signature: &str) -> Result<()> {
        lock(&self.authorize_codes)?
            .remove(signature)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound("Authorization code not found".to_string()))
    }
}
