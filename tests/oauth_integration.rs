//! OAuth 2.0 Integration Tests
//!
//! These tests drive the composed provider through complete flows against the
//! in-memory store: authorization code with refresh rotation, implicit,
//! resource owner password, and client credentials.

use granter::errors::ErrorKind;
use granter::oauth::{
    ClientCredentials, ClientType, ComposeConfig, GrantType, HmacSha256Strategy, OAuthClient,
    Provider, RequestForm, ResponseType, Session, compose_provider,
};
use granter::storage::{MemoryOAuthStorage, traits::AccessTokenStorage};
use chrono::Utc;
use std::sync::Arc;
use url::Url;

const REDIRECT: &str = "https://app.example.com/callback";

fn client(client_id: &str, client_type: ClientType) -> OAuthClient {
    OAuthClient {
        client_id: client_id.to_string(),
        client_secret: match client_type {
            ClientType::Confidential => Some("s3cret".to_string()),
            ClientType::Public => None,
        },
        client_name: Some("Test Application".to_string()),
        redirect_uris: vec![REDIRECT.to_string()],
        grant_types: vec![
            GrantType::AuthorizationCode,
            GrantType::Implicit,
            GrantType::Password,
            GrantType::ClientCredentials,
            GrantType::RefreshToken,
        ],
        response_types: vec![ResponseType::Code, ResponseType::Token],
        scope: Some("read write offline".to_string()),
        client_type,
        created_at: Utc::now(),
    }
}

fn setup() -> (Arc<MemoryOAuthStorage>, Provider) {
    let storage = Arc::new(MemoryOAuthStorage::new());
    storage
        .store_client(client("app", ClientType::Confidential))
        .unwrap();
    storage
        .store_client(client("spa", ClientType::Public))
        .unwrap();
    storage.store_user("peter", "pan").unwrap();

    let strategy = Arc::new(HmacSha256Strategy::new(vec![42u8; 32]).unwrap());
    let provider = compose_provider(&ComposeConfig::default(), storage.clone(), strategy);
    (storage, provider)
}

fn app_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: "app".to_string(),
        client_secret: Some("s3cret".to_string()),
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

async fn authorize_code(provider: &Provider, scope: &str) -> String {
    let mut request = provider
        .new_authorize_request(RequestForm::from_pairs([
            ("client_id", "app"),
            ("response_type", "code"),
            ("redirect_uri", REDIRECT),
            ("scope", scope),
            ("state", "random-state-string"),
        ]))
        .await
        .unwrap();
    let response = provider
        .new_authorize_response(
            &mut request,
            Session::new(serde_json::json!({"subject": "peter"})),
        )
        .await
        .unwrap();

    let url = response.redirect_url();
    assert_eq!(
        query_param(&url, "state").as_deref(),
        Some("random-state-string")
    );
    query_param(&url, "code").expect("Authorization code not found in redirect URL")
}

#[tokio::test]
async fn test_complete_authorization_code_flow() {
    let (storage, provider) = setup();
    let code = authorize_code(&provider, "read offline").await;

    let response = provider
        .token(
            RequestForm::from_pairs([
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", REDIRECT),
            ]),
            app_credentials(),
            Session::default(),
        )
        .await
        .unwrap();

    let body = response.to_map();
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["scope"], "read offline");
    assert!(body["refresh_token"].is_string());
    assert_eq!(storage.access_token_count().unwrap(), 1);
    assert_eq!(storage.refresh_token_count().unwrap(), 1);

    // The access token session carries the session bound at the authorize step.
    let signature = response.access_token().split_once('.').unwrap().1;
    let stored = storage.get_access_token_session(signature).await.unwrap();
    assert_eq!(stored.client_id, "app");
    assert_eq!(stored.session.data()["subject"], "peter");
    assert!(!stored.form.contains("code"));
}

#[tokio::test]
async fn test_authorization_code_replay_rejected() {
    let (_storage, provider) = setup();
    let code = authorize_code(&provider, "read").await;
    let form = || {
        RequestForm::from_pairs([
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", REDIRECT),
        ])
    };

    let first = provider
        .token(form(), app_credentials(), Session::default())
        .await
        .unwrap();
    assert!(first.extra("refresh_token").is_none());

    let err = provider
        .token(form(), app_credentials(), Session::default())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidGrant));
}

#[tokio::test]
async fn test_refresh_token_rotation() {
    let (storage, provider) = setup();
    let code = authorize_code(&provider, "read offline").await;
    let first = provider
        .token(
            RequestForm::from_pairs([
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", REDIRECT),
            ]),
            app_credentials(),
            Session::default(),
        )
        .await
        .unwrap();
    let refresh_token = first.extra("refresh_token").unwrap().as_str().unwrap().to_string();

    let refresh_form = || {
        RequestForm::from_pairs([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
    };
    let second = provider
        .token(refresh_form(), app_credentials(), Session::default())
        .await
        .unwrap();
    let rotated = second.extra("refresh_token").unwrap().as_str().unwrap();
    assert_ne!(rotated, refresh_token);
    assert_ne!(second.access_token(), first.access_token());
    assert_eq!(storage.refresh_token_count().unwrap(), 1);
    assert_eq!(storage.access_token_count().unwrap(), 2);

    // The old refresh token was revoked by the rotation.
    let err = provider
        .token(refresh_form(), app_credentials(), Session::default())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidGrant));
}

#[tokio::test]
async fn test_implicit_flow_uses_fragment() {
    let (_storage, provider) = setup();
    let mut request = provider
        .new_authorize_request(RequestForm::from_pairs([
            ("client_id", "spa"),
            ("response_type", "token"),
            ("scope", "read"),
            ("state", "random-state-string"),
        ]))
        .await
        .unwrap();
    let response = provider
        .new_authorize_response(&mut request, Session::default())
        .await
        .unwrap();

    let url = response.redirect_url();
    assert!(url.query().is_none());
    let fragment: Vec<(String, String)> = url::form_urlencoded::parse(
        url.fragment().unwrap().as_bytes(),
    )
    .into_owned()
    .collect();
    let get = |key: &str| {
        fragment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert!(get("access_token").is_some());
    assert_eq!(get("token_type"), Some("bearer"));
    assert_eq!(get("state"), Some("random-state-string"));
}

#[tokio::test]
async fn test_resource_owner_password_flow() {
    let (storage, provider) = setup();

    let response = provider
        .token(
            RequestForm::from_pairs([
                ("grant_type", "password"),
                ("username", "peter"),
                ("password", "pan"),
                ("scope", "read"),
            ]),
            app_credentials(),
            Session::default(),
        )
        .await
        .unwrap();
    assert!(!response.access_token().is_empty());

    let signature = response.access_token().split_once('.').unwrap().1;
    let stored = storage.get_access_token_session(signature).await.unwrap();
    assert!(!stored.form.contains("password"));
    assert!(!stored.form.contains("username"));

    let err = provider
        .token(
            RequestForm::from_pairs([
                ("grant_type", "password"),
                ("username", "peter"),
                ("password", "hook"),
            ]),
            app_credentials(),
            Session::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidRequest));
}

#[tokio::test]
async fn test_client_credentials_flow() {
    let (_storage, provider) = setup();

    let response = provider
        .token(
            RequestForm::from_pairs([("grant_type", "client_credentials"), ("scope", "write")]),
            app_credentials(),
            Session::default(),
        )
        .await
        .unwrap();
    assert_eq!(response.extra("scope"), Some(&serde_json::json!("write")));
    assert!(response.extra("refresh_token").is_none());

    let err = provider
        .token(
            RequestForm::from_pairs([("grant_type", "client_credentials")]),
            ClientCredentials {
                client_id: "spa".to_string(),
                client_secret: None,
            },
            Session::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidClient));
}
