//! # mapnu-auth - identity verification and session tokens
//!
//! Verifies ID tokens issued by Google, then mints and verifies the short-lived
//! session tokens the rest of mapnu trusts.
//!
//! ## Architecture
//!
//! - [`keys`] - provider signing keys: the [`KeyFetcher`] seam and the
//!   single-flight [`PublicKeyCache`]
//! - [`id_token`] - [`IdTokenVerifier`], RSA signature plus issuer, audience and
//!   expiry checks
//! - [`session`] - [`SessionTokenIssuer`] and [`SessionTokenVerifier`] (HS256,
//!   20 minute lifetime)
//! - [`service`] - [`AuthService`], the handle HTTP handlers use
//! - [`claims`] - [`Claims`], shared by both token kinds
//! - [`config`] - [`AuthConfig`]
//! - [`error`] - [`AuthError`] and friends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapnu_auth::{AuthConfig, AuthService};
//!
//! # async fn run(id_token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env()?;
//! let auth = AuthService::from_config(&config)?;
//!
//! let login = auth.exchange(id_token).await?;
//! let claims = auth.verify_session_token(&login.jwt_token)?;
//! println!("Hello, {}", claims.given_name);
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod id_token;
pub mod keys;
pub mod service;
pub mod session;

#[doc(inline)]
pub use claims::Claims;

#[doc(inline)]
pub use config::{AuthConfig, GOOGLE_ISSUERS};

#[doc(inline)]
pub use error::{AuthError, AuthResult, ConfigError, FetchError, KeyError};

#[doc(inline)]
pub use id_token::IdTokenVerifier;

#[doc(inline)]
pub use keys::{HttpKeyFetcher, KeyFetcher, KeySet, KeySnapshot, PublicKey, PublicKeyCache};

#[doc(inline)]
pub use service::{AuthService, LoginResponse};

#[doc(inline)]
pub use session::{SESSION_TOKEN_LIFETIME, SessionTokenIssuer, SessionTokenVerifier};
