//! Identity provider signing keys
//!
//! - [`fetcher`] - the [`KeyFetcher`] seam and its HTTP implementation
//! - [`cache`] - [`PublicKeyCache`], the single-flight, TTL-bound key snapshot

pub mod cache;
pub mod fetcher;

pub use cache::{KeySnapshot, PublicKeyCache};
pub use fetcher::{HttpKeyFetcher, JwkDocument, KeyFetcher, RawJwk};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::DecodingKey;
use rsa::{BigUint, RsaPublicKey};
use std::collections::HashMap;

use crate::error::KeyError;

/// Key id to public key, as published by the provider at one point in time
pub type KeySet = HashMap<String, PublicKey>;

/// An RSA public key published by the identity provider. Immutable.
#[derive(Clone)]
pub struct PublicKey {
    kid: String,
    modulus: BigUint,
    exponent: BigUint,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("kid", &self.kid)
            .field("modulus_bits", &self.modulus.bits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl PublicKey {
    /// Build a key from its modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Rsa`] if the components are not a valid RSA public key
    /// (e.g. exponent below 2 or modulus larger than 4096 bits).
    pub fn new(kid: impl Into<String>, modulus: BigUint, exponent: BigUint) -> Result<Self, KeyError> {
        RsaPublicKey::new(modulus.clone(), exponent.clone())?;

        let decoding_key =
            DecodingKey::from_rsa_raw_components(&modulus.to_bytes_be(), &exponent.to_bytes_be());

        Ok(Self {
            kid: kid.into(),
            modulus,
            exponent,
            decoding_key,
        })
    }

    /// Build a key from the base64url `n` and `e` members of a JWK.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Base64`] if either member is not unpadded base64url,
    /// or [`KeyError::Rsa`] if the decoded components are rejected.
    pub fn from_components(kid: impl Into<String>, n: &str, e: &str) -> Result<Self, KeyError> {
        let modulus = BigUint::from_bytes_be(&URL_SAFE_NO_PAD.decode(n)?);
        let exponent = BigUint::from_bytes_be(&URL_SAFE_NO_PAD.decode(e)?);
        Self::new(kid, modulus, exponent)
    }

    /// Key id
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// RSA modulus
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// RSA public exponent
    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}
