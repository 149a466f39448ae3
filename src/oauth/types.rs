//! OAuth 2.0 core types and data structures.
//!
//! Defines grant and response type names, the registered client, and the
//! opaque session carried through every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::arguments::Arguments;

/// Scope that entitles the client to a refresh token.
pub const OFFLINE_SCOPE: &str = "offline";

/// OAuth 2.0 Grant Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// OAuth 2.0 Response Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
        }
    }
}

/// OAuth 2.0 Token Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "bearer")]
    Bearer,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Bearer => "bearer",
        }
    }
}

/// Client Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Public,
    Confidential,
}

/// Registered OAuth client as seen by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret (absent for public clients)
    pub client_secret: Option<String>,
    /// Client name
    pub client_name: Option<String>,
    /// Registered redirect URIs
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<GrantType>,
    /// Response types allowed for this client
    pub response_types: Vec<ResponseType>,
    /// Space-delimited scopes the client may request
    pub scope: Option<String>,
    /// Client type (public or confidential)
    pub client_type: ClientType,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl OAuthClient {
    pub fn is_public(&self) -> bool {
        self.client_type == ClientType::Public
    }

    pub fn allows_grant_type(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    pub fn allows_response_type(&self, response_type: ResponseType) -> bool {
        self.response_types.contains(&response_type)
    }

    /// Scopes the client may be granted.
    pub fn scopes(&self) -> Arguments {
        self.scope
            .as_deref()
            .map(Arguments::from_space_delimited)
            .unwrap_or_default()
    }

    /// Whether every requested scope is registered for this client.
    pub fn allows_scopes(&self, requested: &Arguments) -> bool {
        let allowed = self.scopes();
        requested.iter().all(|scope| allowed.has(&[scope]))
    }

    /// Exact string match against the registered redirect URIs.
    pub fn has_redirect_uri(&self, redirect_uri: &Url) -> bool {
        self.redirect_uris
            .iter()
            .filter_map(|registered| Url::parse(registered).ok())
            .any(|registered| &registered == redirect_uri)
    }

    /// The single registered redirect URI, when there is exactly one.
    pub fn default_redirect_uri(&self) -> Option<Url> {
        match self.redirect_uris.as_slice() {
            [only] => Url::parse(only).ok(),
            _ => None,
        }
    }
}

/// Opaque per-request state linking a subject and client to issued tokens.
///
/// The core passes it to storage and token strategies without reading it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(serde_json::Value);

impl Session {
    pub fn new(data: serde_json::Value) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.0
    }
}
