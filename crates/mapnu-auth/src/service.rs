//! Authentication service facade
//!
//! [`AuthService`] owns one key cache, one ID token verifier and the session
//! token issuer/verifier pair, all built from a single [`AuthConfig`]. HTTP
//! handlers hold it behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::claims::Claims;
use crate::config::AuthConfig;
use crate::error::{AuthResult, ConfigError};
use crate::id_token::IdTokenVerifier;
use crate::keys::{HttpKeyFetcher, KeyFetcher, PublicKeyCache};
use crate::session::{SessionTokenIssuer, SessionTokenVerifier};

/// Body returned by the token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token for subsequent requests
    pub jwt_token: String,
}

/// ID token verification and session token issuance behind one handle
#[derive(Debug, Clone)]
pub struct AuthService {
    id_tokens: IdTokenVerifier,
    issuer: SessionTokenIssuer,
    sessions: SessionTokenVerifier,
}

impl AuthService {
    /// Build the service with an HTTP key fetcher for `config.certs_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let fetcher = Arc::new(HttpKeyFetcher::new(config.certs_url.clone()));
        Self::with_fetcher(config, fetcher)
    }

    /// Build the service around a caller-supplied key source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration does not validate.
    pub fn with_fetcher(
        config: &AuthConfig,
        fetcher: Arc<dyn KeyFetcher>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = Arc::new(PublicKeyCache::from_config(config, fetcher));
        info!(
            client_id = %config.client_id,
            certs_url = %config.certs_url,
            key_ttl_secs = config.key_cache_ttl.as_secs(),
            "Authentication service configured"
        );

        Ok(Self {
            id_tokens: IdTokenVerifier::from_config(config, cache),
            issuer: SessionTokenIssuer::from_config(config),
            sessions: SessionTokenVerifier::from_config(config),
        })
    }

    /// Verify a provider ID token
    ///
    /// # Errors
    ///
    /// See [`IdTokenVerifier::verify`].
    pub async fn verify_id_token(&self, raw: &str) -> AuthResult<Claims> {
        self.id_tokens.verify(raw).await
    }

    /// Issue a session token for a verified user
    ///
    /// # Errors
    ///
    /// See [`SessionTokenIssuer::issue`].
    pub fn issue_session_token(
        &self,
        email: &str,
        given_name: &str,
        family_name: &str,
    ) -> AuthResult<String> {
        self.issuer.issue(email, given_name, family_name)
    }

    /// Verify a session token
    ///
    /// # Errors
    ///
    /// See [`SessionTokenVerifier::verify`].
    pub fn verify_session_token(&self, token: &str) -> AuthResult<Claims> {
        self.sessions.verify(token)
    }

    /// Exchange a provider ID token for a session token carrying the same user.
    ///
    /// # Errors
    ///
    /// Any ID token rejection, or [`AuthError::TokenIssuance`](crate::AuthError::TokenIssuance)
    /// if signing fails.
    pub async fn exchange(&self, id_token: &str) -> AuthResult<LoginResponse> {
        let claims = self.verify_id_token(id_token).await?;
        let jwt_token =
            self.issue_session_token(&claims.email, &claims.given_name, &claims.family_name)?;

        info!(sub = ?claims.sub, "Exchanged ID token for session token");
        Ok(LoginResponse { jwt_token })
    }

    /// Key cache used for ID token verification
    pub fn key_cache(&self) -> &Arc<PublicKeyCache> {
        self.id_tokens.cache()
    }
}
