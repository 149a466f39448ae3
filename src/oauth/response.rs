//! Response accumulators filled in by grant handlers.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

use super::types::TokenType;

/// Token endpoint response accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessResponse {
    access_token: String,
    token_type: Option<TokenType>,
    extra: BTreeMap<String, Value>,
}

impl AccessResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn set_token_type(&mut self, token_type: TokenType) {
        self.token_type = Some(token_type);
    }

    pub fn token_type(&self) -> Option<TokenType> {
        self.token_type
    }

    pub fn set_expires_in(&mut self, lifespan: chrono::Duration) {
        self.set_extra("expires_in", lifespan.num_seconds());
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// JSON body returned to the client.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("access_token".to_string(), self.access_token.clone().into());
        if let Some(token_type) = self.token_type {
            map.insert("token_type".to_string(), token_type.as_str().into());
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// Authorization endpoint response accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeResponse {
    redirect_uri: Url,
    query: BTreeMap<String, String>,
    fragment: BTreeMap<String, String>,
}

impl AuthorizeResponse {
    pub fn new(redirect_uri: Url) -> Self {
        Self {
            redirect_uri,
            query: BTreeMap::new(),
            fragment: BTreeMap::new(),
        }
    }

    pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.insert(key.into(), value.into());
    }

    pub fn add_fragment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fragment.insert(key.into(), value.into());
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn fragment(&self) -> &BTreeMap<String, String> {
        &self.fragment
    }

    /// Redirect target with query and fragment parameters applied.
    pub fn redirect_url(&self) -> Url {
        let mut url = self.redirect_uri.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        if !self.fragment.is_empty() {
            let fragment = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.fragment.iter())
                .finish();
            url.set_fragment(Some(&fragment));
        }
        url
    }
}
