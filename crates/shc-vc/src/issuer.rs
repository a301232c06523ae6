//! # Issuer
//!
//! An issuer is identified by its URL (the credential's `iss`) and signs
//! with exactly one private key. Its public key set is what verifiers fetch
//! from the issuer's well-known JWKS location.

use std::sync::Arc;

use serde_json::{Map, Value};

use shc_core::Bundle;
use shc_crypto::{CryptoError, Jws, Jwks, Key, KeySet};

use crate::error::CredentialError;
use crate::health_card::HealthCard;
use crate::payload::Payload;
use crate::profile::PayloadProfile;

/// Issues signed credentials under one private key.
#[derive(Debug, Clone)]
pub struct Issuer {
    url: String,
    key: Key,
}

impl Issuer {
    /// Fails with `InvalidKey` when `key` has no private scalar.
    pub fn new(url: impl Into<String>, key: Key) -> Result<Self, CredentialError> {
        require_private(&key)?;
        Ok(Self {
            url: url.into(),
            key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Replace the signing key. Public keys are rejected and leave the
    /// issuer unchanged.
    pub fn set_key(&mut self, key: Key) -> Result<(), CredentialError> {
        require_private(&key)?;
        self.key = key;
        Ok(())
    }

    /// The public key set to publish for verifiers.
    pub fn to_jwks(&self) -> Jwks {
        KeySet::from(self.key.clone()).to_public_jwks()
    }

    pub fn create_payload(&self, bundle: Bundle, profile: Arc<PayloadProfile>) -> Payload {
        Payload::new(bundle, self.url.clone(), profile)
    }

    /// Minify, frame, compress, and sign `bundle` as a `profile` credential.
    pub fn issue_jws(
        &self,
        bundle: &Bundle,
        profile: Arc<PayloadProfile>,
    ) -> Result<Jws, CredentialError> {
        let profile_id = profile.id().to_string();
        let payload = self.create_payload(bundle.clone(), profile);
        let jws = Jws::new(jws_header(), payload.to_bytes()?, Some(self.key.clone()))?;
        tracing::info!(
            issuer = %self.url,
            kid = %self.key.kid(),
            profile = %profile_id,
            "issued credential"
        );
        Ok(jws)
    }

    /// Issue and wrap in a [`HealthCard`].
    pub fn issue_health_card(
        &self,
        bundle: &Bundle,
        profile: Arc<PayloadProfile>,
    ) -> Result<HealthCard, CredentialError> {
        HealthCard::from_jws(self.issue_jws(bundle, profile)?)
    }
}

/// `{"zip":"DEF","alg":"ES256"}`; the envelope adds `kid`.
fn jws_header() -> Map<String, Value> {
    let mut header = Map::new();
    header.insert("zip".to_string(), Value::String("DEF".to_string()));
    header.insert(
        "alg".to_string(),
        Value::String(shc_crypto::key::ALGORITHM.to_string()),
    );
    header
}

fn require_private(key: &Key) -> Result<(), CredentialError> {
    if key.is_private() {
        Ok(())
    } else {
        Err(CryptoError::InvalidKey(format!(
            "issuer key {} must be private",
            key.kid()
        ))
        .into())
    }
}
