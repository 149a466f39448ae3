//! Environment-based configuration types for the granter server runtime settings.

use anyhow::Result;

use crate::errors::ConfigError;
use crate::oauth::{compose::ComposeConfig, strategy::MIN_SECRET_LENGTH};
use crate::storage::{StorageBackend, parse_storage_backend};

/// HTTP server port configuration
#[derive(Clone, Debug)]
pub struct HttpPort(u16);

/// Secret keying the HMAC token strategy
#[derive(Clone)]
pub struct TokenHmacSecret(Vec<u8>);

/// Access token lifespan configuration
#[derive(Clone, Debug)]
pub struct AccessTokenLifespan(chrono::Duration);

/// Authorization code lifespan configuration
#[derive(Clone, Debug)]
pub struct AuthorizeCodeLifespan(chrono::Duration);

/// Refresh token lifespan configuration
#[derive(Clone, Debug)]
pub struct RefreshTokenLifespan(chrono::Duration);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub external_base: String,
    pub token_hmac_secret: TokenHmacSecret,
    pub access_token_lifespan: AccessTokenLifespan,
    pub authorize_code_lifespan: AuthorizeCodeLifespan,
    pub refresh_token_lifespan: RefreshTokenLifespan,
    pub storage_backend: StorageBackend,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let external_base = require_env("EXTERNAL_BASE")?;
        let token_hmac_secret: TokenHmacSecret = require_env("TOKEN_HMAC_SECRET")?.try_into()?;
        let access_token_lifespan: AccessTokenLifespan =
            default_env("ACCESS_TOKEN_LIFESPAN", "1h").try_into()?;
        let authorize_code_lifespan: AuthorizeCodeLifespan =
            default_env("AUTHORIZE_CODE_LIFESPAN", "10m").try_into()?;
        let refresh_token_lifespan: RefreshTokenLifespan =
            default_env("REFRESH_TOKEN_LIFESPAN", "14d").try_into()?;
        let storage_backend = parse_storage_backend(&default_env("STORAGE_BACKEND", "memory"))?;

        Ok(Self {
            version: version()?,
            http_port,
            external_base,
            token_hmac_secret,
            access_token_lifespan,
            authorize_code_lifespan,
            refresh_token_lifespan,
            storage_backend,
        })
    }

    /// Handler lifespans for [`crate::oauth::compose::compose_provider`]
    pub fn compose_config(&self) -> ComposeConfig {
        ComposeConfig {
            access_token_lifespan: *self.access_token_lifespan.as_ref(),
            authorize_code_lifespan: *self.authorize_code_lifespan.as_ref(),
            refresh_token_lifespan: *self.refresh_token_lifespan.as_ref(),
        }
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    optional_env(name).unwrap_or_else(|| default_value.to_string())
}

fn parse_lifespan(value: String) -> Result<chrono::Duration> {
    let duration = duration_str::parse(&value)
        .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
    Ok(chrono::Duration::from_std(duration)?)
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for TokenHmacSecret {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort(MIN_SECRET_LENGTH));
        }
        Ok(Self(value.into_bytes()))
    }
}

impl std::fmt::Debug for TokenHmacSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenHmacSecret").field(&"[redacted]").finish()
    }
}

impl AsRef<[u8]> for TokenHmacSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for AccessTokenLifespan {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_lifespan(value).map(Self)
    }
}

impl AsRef<chrono::Duration> for AccessTokenLifespan {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for AuthorizeCodeLifespan {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_lifespan(value).map(Self)
    }
}

impl AsRef<chrono::Duration> for AuthorizeCodeLifespan {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for RefreshTokenLifespan {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_lifespan(value).map(Self)
    }
}

impl AsRef<chrono::Duration> for RefreshTokenLifespan {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_port_parsing() {
        assert_eq!(*HttpPort::try_from(String::new()).unwrap().as_ref(), 8080);
        assert_eq!(*HttpPort::try_from("3000".to_string()).unwrap().as_ref(), 3000);
        assert!(HttpPort::try_from("not-a-port".to_string()).is_err());
    }

    #[test]
    fn test_lifespan_parsing() {
        let access = AccessTokenLifespan::try_from("1h".to_string()).unwrap();
        assert_eq!(*access.as_ref(), chrono::Duration::hours(1));

        let code = AuthorizeCodeLifespan::try_from("10m".to_string()).unwrap();
        assert_eq!(*code.as_ref(), chrono::Duration::minutes(10));

        let refresh = RefreshTokenLifespan::try_from("14d".to_string()).unwrap();
        assert_eq!(*refresh.as_ref(), chrono::Duration::days(14));

        let err = AccessTokenLifespan::try_from("soon".to_string()).unwrap_err();
        assert!(err.to_string().starts_with("error-granter-config-4"));
    }

    #[test]
    fn test_token_hmac_secret_length() {
        let err = TokenHmacSecret::try_from("short".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::SecretTooShort(MIN_SECRET_LENGTH)));

        let secret = TokenHmacSecret::try_from("x".repeat(MIN_SECRET_LENGTH)).unwrap();
        assert_eq!(secret.as_ref().len(), MIN_SECRET_LENGTH);
    }

    #[test]
    fn test_version_is_set() {
        assert!(!version().unwrap().is_empty());
    }
}
