//! Authentication configuration
//!
//! The session secret and the OAuth client id are required; everything else has
//! a default. Missing required settings are fatal at start-up and never surface
//! as verification errors.

use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::{Host, Url};

use crate::error::ConfigError;
use crate::keys::cache::{DEFAULT_FETCH_TIMEOUT, DEFAULT_KEY_TTL, DEFAULT_MIN_REFRESH_INTERVAL};
use crate::keys::fetcher::GOOGLE_CERTS_URL;

/// Issuers Google documents for its ID tokens
pub const GOOGLE_ISSUERS: &[&str] = &["https://accounts.google.com", "accounts.google.com"];

/// Environment variable holding the session signing secret
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
/// Environment variable holding the OAuth client id
pub const ENV_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
/// Environment variable overriding the keys endpoint
pub const ENV_CERTS_URL: &str = "GOOGLE_CERTS_URL";
/// Environment variable overriding the key snapshot TTL (seconds)
pub const ENV_KEY_CACHE_TTL: &str = "MAPNU_KEY_CACHE_TTL_SECS";
/// Environment variable overriding the key fetch timeout (seconds)
pub const ENV_KEY_FETCH_TIMEOUT: &str = "MAPNU_KEY_FETCH_TIMEOUT_SECS";
/// Environment variable overriding the clock skew leeway (seconds)
pub const ENV_CLOCK_SKEW: &str = "MAPNU_CLOCK_SKEW_SECS";

/// Settings for ID token verification and session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth client id that ID tokens must be issued to
    pub client_id: String,
    /// Session token signing secret (zeroized on drop)
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub session_secret: SecretString,
    /// Provider keys endpoint
    #[serde(default = "default_certs_url")]
    pub certs_url: String,
    /// Accepted `iss` values
    #[serde(default = "default_issuers")]
    pub allowed_issuers: Vec<String>,
    /// Accepted ID token signing algorithms (RSA family only)
    #[serde(default = "default_id_token_algorithms")]
    pub id_token_algorithms: Vec<Algorithm>,
    /// Key snapshot lifetime
    #[serde(default = "default_key_cache_ttl", with = "duration_secs")]
    pub key_cache_ttl: Duration,
    /// Bound on a single key set fetch
    #[serde(default = "default_key_fetch_timeout", with = "duration_secs")]
    pub key_fetch_timeout: Duration,
    /// Minimum spacing between key set fetches
    #[serde(default = "default_min_refresh_interval", with = "duration_secs")]
    pub min_refresh_interval: Duration,
    /// Clock skew tolerated on `exp` (default: none)
    #[serde(default, with = "duration_secs")]
    pub clock_skew_leeway: Duration,
}

impl AuthConfig {
    /// Create a configuration with default settings
    pub fn new(client_id: impl Into<String>, session_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            session_secret: SecretString::new(session_secret.into()),
            certs_url: default_certs_url(),
            allowed_issuers: default_issuers(),
            id_token_algorithms: default_id_token_algorithms(),
            key_cache_ttl: DEFAULT_KEY_TTL,
            key_fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            clock_skew_leeway: Duration::ZERO,
        }
    }

    /// Load from `JWT_SECRET` and `GOOGLE_CLIENT_ID` plus optional overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if a required variable is unset or empty,
    /// or [`ConfigError::Invalid`] if an override does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = required_env(ENV_JWT_SECRET)?;
        let client_id = required_env(ENV_CLIENT_ID)?;

        let mut config = Self::new(client_id, secret);
        if let Ok(url) = std::env::var(ENV_CERTS_URL) {
            config.certs_url = url;
        }
        if let Some(ttl) = secs_env(ENV_KEY_CACHE_TTL)? {
            config.key_cache_ttl = ttl;
        }
        if let Some(timeout) = secs_env(ENV_KEY_FETCH_TIMEOUT)? {
            config.key_fetch_timeout = timeout;
        }
        if let Some(leeway) = secs_env(ENV_CLOCK_SKEW)? {
            config.clock_skew_leeway = leeway;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the keys endpoint
    pub fn with_certs_url(mut self, url: impl Into<String>) -> Self {
        self.certs_url = url.into();
        self
    }

    /// Override the key snapshot lifetime
    pub fn with_key_cache_ttl(mut self, ttl: Duration) -> Self {
        self.key_cache_ttl = ttl;
        self
    }

    /// Override the clock skew leeway
    pub fn with_clock_skew(mut self, leeway: Duration) -> Self {
        self.clock_skew_leeway = leeway;
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_CLIENT_ID));
        }
        if self.session_secret.expose_secret().is_empty() {
            return Err(ConfigError::Missing(ENV_JWT_SECRET));
        }
        if self.allowed_issuers.is_empty() {
            return Err(ConfigError::Invalid {
                name: "allowed_issuers",
                reason: "at least one issuer is required".to_string(),
            });
        }
        if self.id_token_algorithms.is_empty() {
            return Err(ConfigError::Invalid {
                name: "id_token_algorithms",
                reason: "at least one algorithm is required".to_string(),
            });
        }
        if let Some(alg) = self
            .id_token_algorithms
            .iter()
            .find(|alg| !is_rsa(**alg))
        {
            return Err(ConfigError::Invalid {
                name: "id_token_algorithms",
                reason: format!("{alg:?} is not an RSA algorithm"),
            });
        }
        if self.key_cache_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                name: "key_cache_ttl",
                reason: "must be greater than zero".to_string(),
            });
        }

        // HTTPS required for the keys endpoint (HTTP only allowed for loopback)
        let url = Url::parse(&self.certs_url).map_err(|e| ConfigError::Invalid {
            name: "certs_url",
            reason: e.to_string(),
        })?;
        let allowed = match url.scheme() {
            "https" => true,
            "http" => is_loopback(&url),
            _ => false,
        };
        if !allowed {
            return Err(ConfigError::Invalid {
                name: "certs_url",
                reason: "keys endpoint must use HTTPS (HTTP only allowed for localhost)"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

pub(crate) fn is_rsa(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn secs_env(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn default_certs_url() -> String {
    GOOGLE_CERTS_URL.to_string()
}

pub(crate) fn default_issuers() -> Vec<String> {
    GOOGLE_ISSUERS.iter().map(|iss| (*iss).to_string()).collect()
}

fn default_id_token_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

fn default_key_cache_ttl() -> Duration {
    DEFAULT_KEY_TTL
}

fn default_key_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

fn default_min_refresh_interval() -> Duration {
    DEFAULT_MIN_REFRESH_INTERVAL
}

// Custom serialization for SecretString
fn serialize_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

// Custom deserialization for SecretString
fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    Ok(SecretString::new(s))
}

/// Durations as whole seconds in config files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
