//! Typed authorization and access requests.
//!
//! The transport layer parses wire parameters into a [`RequestForm`]; the
//! provider turns that form into an [`AuthorizeRequest`] or [`AccessRequest`]
//! which grant handlers then claim and mutate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

use super::{
    arguments::Arguments,
    types::{OAuthClient, Session},
};
use crate::errors::OAuthError;

/// Form fields never persisted alongside a token session.
const SECRET_FORM_FIELDS: &[&str] = &[
    "password",
    "client_secret",
    "client_assertion",
    "code",
    "refresh_token",
];

/// Multi-valued form or query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestForm(BTreeMap<String, Vec<String>>);

impl RequestForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` body or query string.
    pub fn parse(input: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(input.as_bytes()))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut form = Self::new();
        for (key, value) in pairs {
            form.0.entry(key.into()).or_default().push(value.into());
        }
        form
    }

    /// First value of `key`, treating an empty value as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace all values of `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Client authentication presented with a token request.
#[derive(Clone)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

/// Fields shared by authorization and access requests.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request identifier
    pub id: String,
    /// When the request was received
    pub requested_at: DateTime<Utc>,
    /// Authenticated or identified client
    pub client: Option<OAuthClient>,
    /// Scopes asked for by the client
    pub requested_scopes: Arguments,
    /// Scopes approved by handlers so far
    pub granted_scopes: Arguments,
    /// Raw form or query parameters
    pub form: RequestForm,
    /// Opaque session bound to issued tokens
    pub session: Session,
}

impl Request {
    pub fn new(form: RequestForm) -> Self {
        let requested_scopes = form
            .get("scope")
            .map(Arguments::from_space_delimited)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4().to_string(),
            requested_at: Utc::now(),
            client: None,
            requested_scopes,
            granted_scopes: Arguments::new(),
            form,
            session: Session::default(),
        }
    }

    /// The identified client, required by every handler that checks permissions.
    pub fn client(&self) -> Result<&OAuthClient, OAuthError> {
        self.client
            .as_ref()
            .ok_or_else(|| OAuthError::invalid_client("request carries no client"))
    }

    pub fn grant_scope(&mut self, scope: impl Into<String>) {
        self.granted_scopes.append(scope);
    }

    /// Snapshot persisted by storage, with secrets stripped from the form.
    pub fn to_stored(&self, redirect_uri: Option<&Url>) -> StoredRequest {
        let mut form = self.form.clone();
        for field in SECRET_FORM_FIELDS {
            form.remove(field);
        }
        StoredRequest {
            request_id: self.id.clone(),
            client_id: self
                .client
                .as_ref()
                .map(|c| c.client_id.clone())
                .unwrap_or_default(),
            requested_at: self.requested_at,
            requested_scopes: self.requested_scopes.clone(),
            granted_scopes: self.granted_scopes.clone(),
            form,
            session: self.session.clone(),
            redirect_uri: redirect_uri.map(Url::to_string),
        }
    }
}

/// Request snapshot stored under a token, code, or refresh token signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub request_id: String,
    pub client_id: String,
    pub requested_at: DateTime<Utc>,
    pub requested_scopes: Arguments,
    pub granted_scopes: Arguments,
    pub form: RequestForm,
    pub session: Session,
    /// Redirect URI used at the authorization endpoint, if any
    pub redirect_uri: Option<String>,
}

/// Authorization endpoint request.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub request: Request,
    /// Requested response types, e.g. `code` or `token`
    pub response_types: Arguments,
    /// Resolved redirect URI
    pub redirect_uri: Option<Url>,
    /// Opaque client state echoed back on redirect
    pub state: Option<String>,
    handled_response_types: Arguments,
}

impl AuthorizeRequest {
    pub fn new(request: Request) -> Self {
        let response_types = request
            .form
            .get("response_type")
            .map(Arguments::from_space_delimited)
            .unwrap_or_default();
        let state = request.form.get("state").map(str::to_string);
        Self {
            request,
            response_types,
            redirect_uri: None,
            state,
            handled_response_types: Arguments::new(),
        }
    }

    pub fn set_response_type_handled(&mut self, response_type: &str) {
        self.handled_response_types.append(response_type);
    }

    pub fn is_response_type_handled(&self, response_type: &str) -> bool {
        self.handled_response_types.has(&[response_type])
    }

    /// True once every requested response type has been served by a handler.
    pub fn did_handle_all_response_types(&self) -> bool {
        !self.response_types.is_empty()
            && self
                .response_types
                .iter()
                .all(|rt| self.handled_response_types.has(&[rt]))
    }
}

/// Token endpoint request.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub request: Request,
    /// Declared grant types
    pub grant_types: Arguments,
    handled_grant_types: Arguments,
}

impl AccessRequest {
    pub fn new(request: Request) -> Self {
        let grant_types: Arguments = request.form.get_all("grant_type").iter().cloned().collect();
        Self::with_grant_types(request, grant_types)
    }

    pub fn with_grant_types(request: Request, grant_types: Arguments) -> Self {
        Self {
            request,
            grant_types,
            handled_grant_types: Arguments::new(),
        }
    }

    /// Record that a handler claimed this request.
    ///
    /// A request is claimed at most once; a second claim is a wiring fault.
    pub fn set_grant_type_handled(&mut self, grant_type: &str) -> Result<(), OAuthError> {
        if !self.handled_grant_types.is_empty() {
            return Err(OAuthError::server_error(format!(
                "grant type {grant_type} claimed after {} already handled the request",
                self.handled_grant_types
            )));
        }
        self.handled_grant_types.append(grant_type);
        Ok(())
    }

    pub fn is_grant_type_handled(&self, grant_type: &str) -> bool {
        self.handled_grant_types.has(&[grant_type])
    }

    pub fn is_handled(&self) -> bool {
        !self.handled_grant_types.is_empty()
    }
}
