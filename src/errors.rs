//! Standardized error types following the `error-granter-<domain>-<number>` format.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed collaborator error kept as the cause of an [`OAuthError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-granter-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-granter-config-2 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-granter-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-granter-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when the token signing secret is too short
    #[error("error-granter-config-5 TOKEN_HMAC_SECRET must be at least {0} bytes")]
    SecretTooShort(usize),

    /// Error when the storage backend name is unknown
    #[error("error-granter-config-6 Unsupported storage backend: {0}")]
    UnsupportedStorageBackend(String),
}

/// Storage errors returned by every storage collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when query execution fails
    #[error("error-granter-storage-1 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-granter-storage-2 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when data validation fails
    #[error("error-granter-storage-3 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-granter-storage-4 Not found: {0}")]
    NotFound(String),
}

impl StorageError {
    /// Whether the store reported a missing record rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Token strategy errors
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Token does not have the `<key>.<signature>` shape
    #[error("error-granter-strategy-1 Invalid token format")]
    InvalidTokenFormat,

    /// Token signature does not match its key
    #[error("error-granter-strategy-2 Token signature mismatch")]
    SignatureMismatch,

    /// Signing secret is shorter than the minimum length
    #[error("error-granter-strategy-3 Signing secret must be at least {0} bytes")]
    SecretTooShort(usize),

    /// Token material could not be generated
    #[error("error-granter-strategy-4 Token generation failed: {0}")]
    GenerationFailed(String),
}

/// The closed set of OAuth 2.0 error kinds (RFC 6749 Section 5.2 and 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    UnsupportedResponseType,
    InvalidScope,
    AccessDenied,
    ServerError,
}

impl ErrorKind {
    /// Wire error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::ServerError => "server_error",
        }
    }

    /// Fixed description that is safe to show to untrusted callers
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => {
                "The request is missing a required parameter, includes an invalid parameter value, or is otherwise malformed"
            }
            ErrorKind::InvalidClient => "Client authentication failed",
            ErrorKind::InvalidGrant => {
                "The provided authorization grant or refresh token is invalid, expired, revoked, or was issued to another client"
            }
            ErrorKind::UnauthorizedClient => {
                "The client is not authorized to request a token using this method"
            }
            ErrorKind::UnsupportedGrantType => {
                "The authorization grant type is not supported by the authorization server"
            }
            ErrorKind::UnsupportedResponseType => {
                "The authorization server does not support obtaining a token using this method"
            }
            ErrorKind::InvalidScope => {
                "The requested scope is invalid, unknown, or malformed"
            }
            ErrorKind::AccessDenied => {
                "The resource owner or authorization server denied the request"
            }
            ErrorKind::ServerError => {
                "The authorization server encountered an unexpected condition that prevented it from fulfilling the request"
            }
        }
    }

    /// HTTP status used when the error is rendered by the token endpoint
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidClient => StatusCode::UNAUTHORIZED,
            ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn number(&self) -> u8 {
        match self {
            ErrorKind::InvalidRequest => 1,
            ErrorKind::InvalidClient => 2,
            ErrorKind::InvalidGrant => 3,
            ErrorKind::UnauthorizedClient => 4,
            ErrorKind::UnsupportedGrantType => 5,
            ErrorKind::UnsupportedResponseType => 6,
            ErrorKind::InvalidScope => 7,
            ErrorKind::AccessDenied => 8,
            ErrorKind::ServerError => 9,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth error raised by handlers and the provider.
///
/// The `kind` decides what the caller sees. `detail` and `cause` are kept for
/// logs and diagnostics only and never leave the process.
#[derive(Debug, Error)]
#[error("error-granter-oauth-{} {}: {}", .kind.number(), .kind, .detail)]
pub struct OAuthError {
    kind: ErrorKind,
    detail: String,
    #[source]
    cause: Option<BoxError>,
}

impl OAuthError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            cause: None,
        }
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, detail)
    }

    pub fn invalid_client(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidClient, detail)
    }

    pub fn invalid_grant(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, detail)
    }

    pub fn unauthorized_client(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedClient, detail)
    }

    pub fn unsupported_grant_type(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType, detail)
    }

    pub fn unsupported_response_type(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedResponseType, detail)
    }

    pub fn invalid_scope(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, detail)
    }

    pub fn access_denied(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, detail)
    }

    pub fn server_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, detail)
    }

    /// Attach the collaborator error that caused this one.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// True when this error, or any `OAuthError` in its cause chain, has `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        if self.kind == kind {
            return true;
        }
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            if let Some(oauth) = err.downcast_ref::<OAuthError>() {
                if oauth.kind == kind {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }

    /// External representation: fixed code and description only.
    pub fn to_error_response(&self, state: Option<String>) -> OAuthErrorResponse {
        OAuthErrorResponse {
            error: self.kind.as_str().to_string(),
            error_description: Some(self.kind.description().to_string()),
            error_uri: None,
            state,
        }
    }
}

impl From<StorageError> for OAuthError {
    fn from(err: StorageError) -> Self {
        OAuthError::server_error("storage failure").with_cause(err)
    }
}

/// OAuth Error Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    /// Error code
    pub error: String,
    /// Error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// Error URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
    /// State parameter (for authorization errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::ServerError {
            tracing::error!(error = ?self, "oauth request failed");
        } else {
            tracing::debug!(error = %self, "oauth request rejected");
        }
        let status = self.kind.status_code();
        (status, Json(self.to_error_response(None))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_predicate_walks_cause_chain() {
        let inner = OAuthError::invalid_grant("code expired");
        let outer = OAuthError::server_error("wrapped").with_cause(inner);

        assert!(outer.is(ErrorKind::ServerError));
        assert!(outer.is(ErrorKind::InvalidGrant));
        assert!(!outer.is(ErrorKind::InvalidClient));
    }

    #[test]
    fn test_storage_error_maps_to_server_error() {
        let err: OAuthError = StorageError::QueryFailed("boom".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_response_does_not_leak_detail() {
        let err = OAuthError::invalid_request("user peter not found in table users")
            .with_cause(StorageError::NotFound("peter".to_string()));
        let response = err.to_error_response(Some("state-123".to_string()));

        assert_eq!(response.error, "invalid_request");
        let description = response.error_description.unwrap();
        assert!(!description.contains("peter"));
        assert_eq!(response.state, Some("state-123".to_string()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ErrorKind::InvalidClient.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorKind::ServerError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::UnsupportedGrantType.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_display_uses_error_code_format() {
        let err = OAuthError::unsupported_grant_type("urn:custom");
        assert_eq!(
            err.to_string(),
            "error-granter-oauth-5 unsupported_grant_type: urn:custom"
        );
    }
}
