//! Session tokens minted and verified by this service
//!
//! Session tokens are HS256 JWTs signed with the process-wide secret. They carry
//! the user's names, `iat` and a fixed 20 minute `exp`; no issuer or audience.
//! Verification shares nothing with the ID token path beyond [`Claims`] and the
//! expiry check.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::IgnoredAny;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::claims::{Claims, UnverifiedToken, decode_unverified, unix_now};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// Lifetime of every session token
pub const SESSION_TOKEN_LIFETIME: Duration = Duration::from_secs(20 * 60);

/// Signing algorithm for session tokens
pub const SESSION_TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// `alg` header value of [`SESSION_TOKEN_ALGORITHM`]
const SESSION_TOKEN_ALGORITHM_NAME: &str = "HS256";

/// Mints session tokens
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenIssuer")
            .field("algorithm", &SESSION_TOKEN_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl SessionTokenIssuer {
    /// Create an issuer signing with `secret`
    pub fn new(secret: &SecretString) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        }
    }

    /// Create an issuer from configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.session_secret)
    }

    /// Issue a session token for a verified user, valid for
    /// [`SESSION_TOKEN_LIFETIME`] from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenIssuance`] if the token cannot be signed.
    pub fn issue(&self, email: &str, given_name: &str, family_name: &str) -> AuthResult<String> {
        self.issue_at(email, given_name, family_name, unix_now())
    }

    pub(crate) fn issue_at(
        &self,
        email: &str,
        given_name: &str,
        family_name: &str,
        now: u64,
    ) -> AuthResult<String> {
        let claims = Claims {
            email: email.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            sub: None,
            iss: None,
            aud: Vec::new(),
            iat: Some(now),
            exp: now + SESSION_TOKEN_LIFETIME.as_secs(),
        };

        let token = encode(&Header::new(SESSION_TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(error = %e, "Failed to sign session token");
                AuthError::TokenIssuance(e.to_string())
            })?;

        debug!(exp = claims.exp, "Issued session token");
        Ok(token)
    }
}

/// Verifies session tokens
#[derive(Clone)]
pub struct SessionTokenVerifier {
    decoding_key: DecodingKey,
    leeway: Duration,
}

impl std::fmt::Debug for SessionTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenVerifier")
            .field("algorithm", &SESSION_TOKEN_ALGORITHM)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl SessionTokenVerifier {
    /// Create a verifier for tokens signed with `secret`
    pub fn new(secret: &SecretString) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            leeway: Duration::ZERO,
        }
    }

    /// Create a verifier from configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.session_secret).with_leeway(config.clock_skew_leeway)
    }

    /// Tolerate this much clock skew on `exp`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Verify a session token and return its claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the token does not decode
    /// - [`AuthError::AlgorithmMismatch`] if the header names anything but HS256
    /// - [`AuthError::SecretMismatch`] if the MAC does not verify
    /// - [`AuthError::TokenExpired`] if the token is past its expiry
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, unix_now())
    }

    pub(crate) fn verify_at(&self, token: &str, now: u64) -> AuthResult<Claims> {
        let UnverifiedToken { header, claims } = decode_unverified(token)?;

        if header.alg != SESSION_TOKEN_ALGORITHM_NAME {
            warn!(algorithm = %header.alg, "Rejected session token: unexpected signing method");
            return Err(AuthError::AlgorithmMismatch(header.alg));
        }

        let mut validation = Validation::new(SESSION_TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        // Header and payload decoded above, so any failure here is the MAC
        decode::<IgnoredAny>(token, &self.decoding_key, &validation).map_err(|e| {
            warn!(reason = ?e.kind(), "Rejected session token: signature mismatch");
            AuthError::SecretMismatch
        })?;

        claims.ensure_not_expired(now, self.leeway).inspect_err(|_| {
            debug!(exp = claims.exp, "Rejected session token: expired");
        })?;

        Ok(claims)
    }
}
