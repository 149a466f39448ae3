//! Pluggable token strategies.
//!
//! A strategy turns a session into opaque token material and recovers the
//! storage signature from a presented token. Handlers hold one strategy per
//! token kind (access token, refresh token, authorization code).

use base64::prelude::*;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::types::Session;
use crate::errors::StrategyError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum secret length accepted by [`HmacSha256Strategy`].
pub const MIN_SECRET_LENGTH: usize = 32;

const KEY_LENGTH: usize = 32;

/// Token material issued to the client together with its storage key.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct GeneratedToken {
    /// Full token handed to the client
    pub token: String,
    /// Key under which storage files the session
    pub signature: String,
}

/// Generates and validates tokens of one kind.
///
/// Implementations must be safe to call from many requests at once.
pub trait TokenStrategy: Send + Sync {
    /// Mint a new token bound to `session`.
    fn generate(&self, session: &Session) -> Result<GeneratedToken, StrategyError>;

    /// Check a presented token and return its storage signature.
    fn validate(&self, token: &str) -> Result<String, StrategyError>;
}

/// Opaque `<key>.<signature>` tokens where the signature is
/// HMAC-SHA256(secret, key). Only the signature is ever stored.
pub struct HmacSha256Strategy {
    secret: Vec<u8>,
}

impl HmacSha256Strategy {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, StrategyError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(StrategyError::SecretTooShort(MIN_SECRET_LENGTH));
        }
        Ok(Self { secret })
    }

    fn mac(&self) -> Result<HmacSha256, StrategyError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StrategyError::GenerationFailed(e.to_string()))
    }
}

impl TokenStrategy for HmacSha256Strategy {
    fn generate(&self, _session: &Session) -> Result<GeneratedToken, StrategyError> {
        let mut key = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);

        let mut mac = self.mac()?;
        mac.update(&key);
        let signature = BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        let token = format!("{}.{}", BASE64_URL_SAFE_NO_PAD.encode(key), signature);

        Ok(GeneratedToken { token, signature })
    }

    fn validate(&self, token: &str) -> Result<String, StrategyError> {
        let (key, signature) = token
            .split_once('.')
            .ok_or(StrategyError::InvalidTokenFormat)?;
        let key = BASE64_URL_SAFE_NO_PAD
            .decode(key)
            .map_err(|_| StrategyError::InvalidTokenFormat)?;
        let decoded_signature = BASE64_URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| StrategyError::InvalidTokenFormat)?;
        if key.len() != KEY_LENGTH {
            return Err(StrategyError::InvalidTokenFormat);
        }

        let mut mac = self.mac()?;
        mac.update(&key);
        mac.verify_slice(&decoded_signature)
            .map_err(|_| StrategyError::SignatureMismatch)?;

        Ok(signature.to_string())
    }
}
