//! Handles GET /oauth/authorize and POST /oauth/token

use axum::{
    Json,
    extract::{RawForm, RawQuery, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use base64::prelude::*;
use serde_json::json;
use std::sync::Arc;

use super::context::AppState;
use crate::errors::{ErrorKind, OAuthError};
use crate::oauth::{
    AuthorizeRequest, AuthorizeResponse, ClientCredentials, Provider, RequestForm, Session,
};

/// GET /oauth/authorize - Issues a code or token to an authenticated resource owner
///
/// The resource owner authenticates with HTTP Basic credentials. Errors found
/// before the redirect URI is trusted are rendered directly; later errors are
/// sent back to the client's redirect URI.
pub async fn handle_oauth_authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let form = RequestForm::parse(query.as_deref().unwrap_or_default());
    let mut request = match state.provider.new_authorize_request(form).await {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let session = match authenticate_resource_owner(&state, &headers).await {
        Ok(session) => session,
        Err(e) => return redirect_error(&request, e),
    };

    match state
        .provider
        .new_authorize_response(&mut request, session)
        .await
    {
        Ok(response) => Redirect::to(response.redirect_url().as_str()).into_response(),
        Err(e) => redirect_error(&request, e),
    }
}

/// POST /oauth/token - Exchanges a grant for an access token
pub async fn handle_oauth_token(
    State(provider): State<Arc<Provider>>,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Result<impl IntoResponse, OAuthError> {
    let body = std::str::from_utf8(&body).map_err(|e| {
        OAuthError::invalid_request("form body is not valid UTF-8").with_cause(e)
    })?;
    let form = RequestForm::parse(body);
    let credentials = client_credentials(&headers, &form)
        .ok_or_else(|| OAuthError::invalid_client("client authentication is required"))?;

    let response = provider
        .token(form, credentials, Session::default())
        .await?;

    Ok((
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response.to_map()),
    ))
}

async fn authenticate_resource_owner(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Session, OAuthError> {
    let (username, password) = basic_credentials(headers)
        .ok_or_else(|| OAuthError::access_denied("resource owner credentials are required"))?;

    match state.resource_owners.authenticate(&username, &password).await {
        Ok(()) => Ok(Session::new(json!({ "subject": username }))),
        Err(e) if e.is_not_found() => {
            Err(OAuthError::access_denied("invalid resource owner credentials").with_cause(e))
        }
        Err(e) => Err(OAuthError::server_error("resource owner lookup failed").with_cause(e)),
    }
}

/// Send `err` to the client's redirect URI, in the fragment for token responses.
fn redirect_error(request: &AuthorizeRequest, err: OAuthError) -> Response {
    let Some(redirect_uri) = request.redirect_uri.clone() else {
        return err.into_response();
    };

    if err.kind() == ErrorKind::ServerError {
        tracing::error!(error = ?err, "authorization request failed");
    } else {
        tracing::debug!(error = %err, "authorization request rejected");
    }

    let body = err.to_error_response(request.state.clone());
    let mut params = vec![("error", body.error)];
    if let Some(description) = body.error_description {
        params.push(("error_description", description));
    }
    if let Some(state) = body.state {
        params.push(("state", state));
    }

    let mut response = AuthorizeResponse::new(redirect_uri);
    let use_fragment = request.response_types.has(&["token"]);
    for (key, value) in params {
        if use_fragment {
            response.add_fragment(key, value);
        } else {
            response.add_query(key, value);
        }
    }
    Redirect::to(response.redirect_url().as_str()).into_response()
}

/// Client authentication from the Authorization header, falling back to the form.
///
/// Client ids and secrets in the header are form-urlencoded before base64.
fn client_credentials(headers: &HeaderMap, form: &RequestForm) -> Option<ClientCredentials> {
    if let Some((client_id, client_secret)) = basic_credentials(headers) {
        return Some(ClientCredentials {
            client_id: form_decode(&client_id)?,
            client_secret: Some(form_decode(&client_secret)?),
        });
    }

    form.get("client_id").map(|client_id| ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: form.get("client_secret").map(str::to_string),
    })
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Decode one `application/x-www-form-urlencoded` component.
fn form_decode(value: &str) -> Option<String> {
    if value.contains(['&', '=']) {
        return None;
    }
    Some(
        url::form_urlencoded::parse(value.as_bytes())
            .map(|(key, _)| key.into_owned())
            .next()
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(user: &str, pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let encoded = BASE64_STANDARD.encode(format!("{user}:{pass}"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_basic_credentials() {
        assert_eq!(
            basic_credentials(&basic("foo", "b:ar")),
            Some(("foo".to_string(), "b:ar".to_string()))
        );
        assert_eq!(basic_credentials(&HeaderMap::new()), None);

        let mut bearer = HeaderMap::new();
        bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&bearer), None);
    }

    #[test]
    fn test_client_credentials_prefers_header() {
        let form = RequestForm::from_pairs([("client_id", "form"), ("client_secret", "secret")]);

        let from_header = client_credentials(&basic("header", "pw"), &form).unwrap();
        assert_eq!(from_header.client_id, "header");
        assert_eq!(from_header.client_secret.as_deref(), Some("pw"));

        let from_form = client_credentials(&HeaderMap::new(), &form).unwrap();
        assert_eq!(from_form.client_id, "form");
        assert_eq!(from_form.client_secret.as_deref(), Some("secret"));

        assert!(client_credentials(&HeaderMap::new(), &RequestForm::new()).is_none());
    }

    #[test]
    fn test_client_credentials_decodes_header_values() {
        let form = RequestForm::new();

        let decoded = client_credentials(&basic("my%20app", "p%25ss+word"), &form).unwrap();
        assert_eq!(decoded.client_id, "my app");
        assert_eq!(decoded.client_secret.as_deref(), Some("p%ss word"));

        let empty = client_credentials(&basic("app", ""), &form).unwrap();
        assert_eq!(empty.client_secret.as_deref(), Some(""));

        assert!(client_credentials(&basic("app", "a=b"), &form).is_none());
    }
}
