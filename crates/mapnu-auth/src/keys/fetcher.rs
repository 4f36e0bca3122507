//! Provider key set retrieval
//!
//! [`KeyFetcher`] is the only place the core touches the network. It performs a
//! single GET with no retries; caching, timeouts and refresh policy belong to
//! [`PublicKeyCache`](super::PublicKeyCache).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{KeySet, PublicKey};
use crate::error::FetchError;

/// Google's OAuth 2.0 signing keys
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Source of the identity provider's current signing keys
#[async_trait]
pub trait KeyFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch the complete current key set.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the key set could not be retrieved or parsed.
    async fn fetch_keys(&self) -> Result<KeySet, FetchError>;
}

/// JSON Web Key as published on the keys endpoint. Only RSA members are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJwk {
    /// Key ID
    pub kid: String,
    /// RSA modulus (base64url encoded)
    #[serde(default)]
    pub n: String,
    /// RSA exponent (base64url encoded)
    #[serde(default)]
    pub e: String,
    /// Key Type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    /// Algorithm (RS256, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

/// Key set document (`{"keys": [...]}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkDocument {
    /// Published keys
    pub keys: Vec<RawJwk>,
}

impl JwkDocument {
    /// Convert to a [`KeySet`], skipping keys that are not usable RSA keys.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidResponse`] if no key survives, so an empty
    /// or garbled document never replaces a working key set.
    pub fn into_key_set(self) -> Result<KeySet, FetchError> {
        let mut keys = KeySet::new();
        for jwk in self.keys {
            if let Some(kty) = jwk.kty.as_deref()
                && kty != "RSA"
            {
                debug!(kid = %jwk.kid, kty = kty, "Skipping non-RSA key");
                continue;
            }

            match PublicKey::from_components(jwk.kid.clone(), &jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => {
                    warn!(kid = %jwk.kid, error = %e, "Failed to parse JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err(FetchError::InvalidResponse(
                "no usable RSA keys in key set".to_string(),
            ));
        }
        Ok(keys)
    }
}

/// Fetches the key set with a plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    uri: String,
    http_client: reqwest::Client,
}

impl HttpKeyFetcher {
    /// Create a fetcher for the given keys endpoint
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_client(uri, reqwest::Client::new())
    }

    /// Create a fetcher that reuses an existing HTTP client
    pub fn with_client(uri: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            uri: uri.into(),
            http_client,
        }
    }

    /// Keys endpoint URI
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Default for HttpKeyFetcher {
    fn default() -> Self {
        Self::new(GOOGLE_CERTS_URL)
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch_keys(&self) -> Result<KeySet, FetchError> {
        info!(uri = %self.uri, "Fetching provider public keys");

        let response = self
            .http_client
            .get(&self.uri)
            .send()
            .await
            .map_err(|e| {
                error!(uri = %self.uri, error = %e, "Failed to fetch key set");
                FetchError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(uri = %self.uri, status = %status, "Keys endpoint returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let document: JwkDocument = response.json().await.map_err(|e| {
            error!(uri = %self.uri, error = %e, "Failed to parse key set JSON");
            FetchError::InvalidResponse(e.to_string())
        })?;

        let keys = document.into_key_set()?;
        info!(uri = %self.uri, key_count = keys.len(), "Fetched provider public keys");
        Ok(keys)
    }
}
