//! Error types for token verification, key retrieval and configuration
//!
//! Every verification failure is terminal for the call that produced it: callers
//! receive either verified [`Claims`](crate::Claims) or one of these errors, never both.

use thiserror::Error;

/// Reasons a token was rejected or could not be produced
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token is not a well-formed `header.payload.signature` JWT
    #[error("invalid token: {0}")]
    MalformedToken(String),

    /// ID token header carries no `kid`
    #[error("invalid token header: missing key id")]
    MissingKeyId,

    /// No provider key with this id, even after refreshing the key set
    #[error("key resolution failed: no public key for kid '{kid}'")]
    UnknownSigningKey {
        /// The key id named by the token header
        kid: String,
    },

    /// The provider's key set could not be fetched
    #[error("key resolution failed: {0}")]
    KeyFetchFailed(#[source] FetchError),

    /// RSA signature does not verify under the resolved provider key
    #[error("signature verification failed")]
    SignatureInvalid,

    /// `iss` is not one of the provider's documented issuers
    #[error("invalid issuer: {issuer:?}")]
    IssuerMismatch {
        /// Issuer found in the token, if any
        issuer: Option<String>,
    },

    /// The configured client id is not in `aud`
    #[error("invalid audience: {audience:?}")]
    AudienceMismatch {
        /// Audience list found in the token
        audience: Vec<String>,
    },

    /// `exp` is not after the current time
    #[error("token expired at {expired_at}")]
    TokenExpired {
        /// Expiry from the token, seconds since the Unix epoch
        expired_at: u64,
    },

    /// Header declares an algorithm this verifier does not accept
    #[error("unexpected signing method: {0}")]
    AlgorithmMismatch(String),

    /// Session token MAC does not verify under the service secret
    #[error("invalid token: signature mismatch")]
    SecretMismatch,

    /// A session token could not be signed
    #[error("failed to issue session token: {0}")]
    TokenIssuance(String),
}

impl AuthError {
    /// Whether this error is an authentication rejection (HTTP 401) rather
    /// than a failure on the service side.
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, Self::TokenIssuance(_))
    }
}

/// Key set retrieval failure
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request to the keys endpoint failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Keys endpoint answered with a non-success status
    #[error("keys endpoint returned status {0}")]
    Status(u16),

    /// Response body was not a key set document
    #[error("invalid key set response: {0}")]
    InvalidResponse(String),

    /// Fetch did not complete within the configured timeout
    #[error("key set fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A published key could not be turned into an RSA public key
#[derive(Debug, Error)]
pub enum KeyError {
    /// `n` or `e` is not unpadded base64url
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Components do not form a usable RSA public key
    #[error("invalid RSA key: {0}")]
    Rsa(#[from] rsa::Error),
}

/// Configuration loading or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required setting is absent
    #[error("{0} is missing")]
    Missing(&'static str),

    /// Setting is present but unusable
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result alias for verification operations
pub type AuthResult<T> = Result<T, AuthError>;
