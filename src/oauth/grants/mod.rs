//! Grant type handlers plugged into the endpoint handler chains.

pub mod client_credentials;
pub mod explicit;
pub mod implicit;
pub mod owner;
pub mod refresh;

pub use client_credentials::ClientCredentialsGrantHandler;
pub use explicit::AuthorizeExplicitGrantHandler;
pub use implicit::ImplicitGrantHandler;
pub use owner::ResourceOwnerPasswordCredentialsGrantHandler;
pub use refresh::RefreshTokenGrantHandler;

use super::{
    arguments::Arguments,
    request::Request,
    response::AccessResponse,
    strategy::{GeneratedToken, TokenStrategy},
    types::{Session, TokenType},
};
use crate::errors::{OAuthError, StorageError};
use chrono::{DateTime, Utc};

/// Mint a token, mapping strategy failures to `server_error`.
pub(crate) fn generate_token(
    strategy: &dyn TokenStrategy,
    session: &Session,
    token_kind: &'static str,
) -> Result<GeneratedToken, OAuthError> {
    strategy.generate(session).map_err(|e| {
        tracing::error!(error = ?e, token_kind, "token generation failed");
        OAuthError::server_error(format!("unable to generate {token_kind}")).with_cause(e)
    })
}

/// Translate a storage error: not found becomes `not_found()`, anything else
/// is a `server_error`.
pub(crate) fn map_storage_error(
    err: StorageError,
    not_found: impl FnOnce() -> OAuthError,
) -> OAuthError {
    if err.is_not_found() {
        not_found().with_cause(err)
    } else {
        tracing::error!(error = ?err, "storage operation failed");
        OAuthError::server_error("storage operation failed").with_cause(err)
    }
}

/// Whether a session issued at `issued_at` has outlived `lifespan`.
///
/// A lifespan too large to represent never expires.
pub(crate) fn has_expired(issued_at: DateTime<Utc>, lifespan: chrono::Duration) -> bool {
    issued_at
        .checked_add_signed(lifespan)
        .is_some_and(|expires_at| expires_at < Utc::now())
}

/// Check requested scopes against the client's and grant all of them.
pub(crate) fn grant_requested_scopes(request: &mut Request) -> Result<(), OAuthError> {
    if !request.client()?.allows_scopes(&request.requested_scopes) {
        return Err(OAuthError::invalid_scope(format!(
            "client may not request scope \"{}\"",
            request.requested_scopes
        )));
    }
    let scopes = request.requested_scopes.clone();
    for scope in scopes.iter() {
        request.grant_scope(scope);
    }
    Ok(())
}

/// Write the bearer token fields every token endpoint response carries.
pub(crate) fn write_bearer_token(
    response: &mut AccessResponse,
    access_token: String,
    lifespan: chrono::Duration,
    granted_scopes: &Arguments,
) {
    response.set_access_token(access_token);
    response.set_token_type(TokenType::Bearer);
    response.set_expires_in(lifespan);
    if !granted_scopes.is_empty() {
        response.set_extra("scope", granted_scopes.to_space_delimited());
    }
}
