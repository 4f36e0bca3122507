//! Provider ID token verification
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. structural decode ([`AuthError::MalformedToken`])
//! 2. key id present ([`AuthError::MissingKeyId`]) and algorithm allowed
//!    ([`AuthError::AlgorithmMismatch`])
//! 3. key resolution through the [`PublicKeyCache`]
//! 4. RSA signature ([`AuthError::SignatureInvalid`])
//! 5. issuer, audience, expiry
//!
//! Only step 3 can touch the network, and only when the cache decides to refresh.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode};
use serde::de::IgnoredAny;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::claims::{Claims, UnverifiedToken, decode_unverified, unix_now};
use crate::config::{AuthConfig, default_issuers};
use crate::error::{AuthError, AuthResult};
use crate::keys::{PublicKey, PublicKeyCache};

/// Verifies ID tokens signed by the identity provider
#[derive(Debug, Clone)]
pub struct IdTokenVerifier {
    cache: Arc<PublicKeyCache>,
    client_id: String,
    allowed_issuers: Vec<String>,
    allowed_algorithms: Vec<Algorithm>,
    leeway: Duration,
}

impl IdTokenVerifier {
    /// Create a verifier for `client_id` using the provider's documented issuers,
    /// RS256 only and no clock skew leeway.
    pub fn new(cache: Arc<PublicKeyCache>, client_id: impl Into<String>) -> Self {
        Self {
            cache,
            client_id: client_id.into(),
            allowed_issuers: default_issuers(),
            allowed_algorithms: vec![Algorithm::RS256],
            leeway: Duration::ZERO,
        }
    }

    /// Create a verifier from configuration
    pub fn from_config(config: &AuthConfig, cache: Arc<PublicKeyCache>) -> Self {
        Self {
            cache,
            client_id: config.client_id.clone(),
            allowed_issuers: config.allowed_issuers.clone(),
            allowed_algorithms: config.id_token_algorithms.clone(),
            leeway: config.clock_skew_leeway,
        }
    }

    /// Replace the accepted issuers
    pub fn with_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Tolerate this much clock skew on `exp`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Key cache backing this verifier
    pub fn cache(&self) -> &Arc<PublicKeyCache> {
        &self.cache
    }

    /// Verify a raw ID token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] for the first check that fails. No partial claims
    /// are ever returned.
    pub async fn verify(&self, raw: &str) -> AuthResult<Claims> {
        let unverified = decode_unverified(raw).inspect_err(|e| {
            warn!(error = %e, "Rejected ID token: malformed");
        })?;
        let UnverifiedToken { header, claims } = unverified;

        let Some(kid) = header.kid.as_deref() else {
            warn!("Rejected ID token: header has no kid");
            return Err(AuthError::MissingKeyId);
        };

        let Some(alg) = header
            .alg
            .parse::<Algorithm>()
            .ok()
            .filter(|alg| self.allowed_algorithms.contains(alg))
        else {
            warn!(
                algorithm = %header.alg,
                allowed = ?self.allowed_algorithms,
                "Rejected ID token: algorithm not allowed"
            );
            return Err(AuthError::AlgorithmMismatch(header.alg.clone()));
        };

        let key = self.cache.lookup(kid).await.inspect_err(|e| {
            warn!(kid = kid, error = %e, "Rejected ID token: key resolution failed");
        })?;

        verify_signature(raw, alg, &key)?;

        self.check_issuer(&claims)?;
        self.check_audience(&claims)?;
        claims
            .ensure_not_expired(unix_now(), self.leeway)
            .inspect_err(|_| {
                warn!(exp = claims.exp, "Rejected ID token: expired");
            })?;

        info!(kid = kid, sub = ?claims.sub, "ID token verified");
        Ok(claims)
    }

    fn check_issuer(&self, claims: &Claims) -> AuthResult<()> {
        match claims.iss.as_deref() {
            Some(iss) if self.allowed_issuers.iter().any(|allowed| allowed == iss) => Ok(()),
            other => {
                warn!(issuer = ?other, "Rejected ID token: issuer not allowed");
                Err(AuthError::IssuerMismatch {
                    issuer: other.map(str::to_string),
                })
            }
        }
    }

    fn check_audience(&self, claims: &Claims) -> AuthResult<()> {
        if claims.aud.iter().any(|aud| *aud == self.client_id) {
            return Ok(());
        }
        warn!(audience = ?claims.aud, "Rejected ID token: client id not in audience");
        Err(AuthError::AudienceMismatch {
            audience: claims.aud.clone(),
        })
    }
}

/// Check the RSA signature only; claim checks are done by the caller so each
/// failure keeps its own error.
fn verify_signature(raw: &str, alg: Algorithm, key: &PublicKey) -> AuthResult<()> {
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<IgnoredAny>(raw, key.decoding_key(), &validation) {
        Ok(_) => {
            debug!(kid = key.kid(), "ID token signature verified");
            Ok(())
        }
        Err(e) => match e.kind() {
            // Header and payload already decoded, so these can only come from the signature
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::InvalidRsaKey(_) => {
                warn!(kid = key.kid(), "Rejected ID token: signature invalid");
                Err(AuthError::SignatureInvalid)
            }
            _ => {
                warn!(kid = key.kid(), error = %e, "Rejected ID token: undecodable");
                Err(AuthError::MalformedToken(e.to_string()))
            }
        },
    }
}
