//! Claims carried by provider ID tokens and session tokens
//!
//! Both token kinds share this type and the expiry check below. Everything
//! else about them (algorithms, keys, issuer and audience rules) is kept in
//! separate verifiers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{AuthError, AuthResult};

/// Identity and validity attributes of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    #[serde(default)]
    pub email: String,
    /// Given name
    #[serde(default)]
    pub given_name: String,
    /// Family name
    #[serde(default)]
    pub family_name: String,
    /// Subject (provider user id); absent on session tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer; absent on session tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience; providers send either a string or an array
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aud: Vec<String>,
    /// Issued at, seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expires at, seconds since the Unix epoch
    pub exp: u64,
}

impl Claims {
    /// Expiry as a [`SystemTime`]
    pub fn expires_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.exp)
    }

    /// Reject the claims unless `exp` is strictly after `now`.
    ///
    /// `leeway` tolerates clock skew between the issuer and this host.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] when the token is past its expiry.
    pub fn ensure_not_expired(&self, now: u64, leeway: Duration) -> AuthResult<()> {
        if self.exp.saturating_add(leeway.as_secs()) > now {
            Ok(())
        } else {
            Err(AuthError::TokenExpired {
                expired_at: self.exp,
            })
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    })
}

/// JOSE header fields the verifiers look at.
///
/// `alg` stays a string so that names outside the supported set (`none`,
/// `HS999`) reach the algorithm check instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct RawHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Header and claims read from a token without checking its signature
#[derive(Debug)]
pub(crate) struct UnverifiedToken {
    pub header: RawHeader,
    pub claims: Claims,
}

/// Structurally decode `header.payload.signature`.
///
/// Only the header and payload are read; everything after the second `.` is the
/// signature and is left for the verifiers. Nothing returned here is trusted until
/// the signature has been checked.
pub(crate) fn decode_unverified(token: &str) -> AuthResult<UnverifiedToken> {
    let mut parts = token.splitn(3, '.');
    let (Some(header), Some(payload), Some(_signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken(
            "expected header.payload.signature".to_string(),
        ));
    };

    let header: RawHeader = decode_segment(header)
        .map_err(|e| AuthError::MalformedToken(format!("header: {e}")))?;
    let claims: Claims = decode_segment(payload)
        .map_err(|e| AuthError::MalformedToken(format!("claims: {e}")))?;

    Ok(UnverifiedToken { header, claims })
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Current time in seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
