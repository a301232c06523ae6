//! # Health Card Verifier
//!
//! Holds a set of trusted public keys and checks signed envelopes against
//! them. When the signing key is not trusted locally and resolution is
//! enabled, the issuer's published key set is fetched and searched.
//!
//! ## Concurrency
//!
//! Trusted keys and the resolution flag sit behind interior locks so one
//! verifier can be shared across tasks, including the process-wide default.
//! No lock is held across an await point.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde_json::Value;

use shc_crypto::{Jws, Key, KeySet};
use shc_vc::{unframe, HealthCard};

use crate::config::ResolverConfig;
use crate::error::VerifierError;
use crate::resolver::{HttpKeySetResolver, KeySetResolver};

/// Something `verify` accepts.
#[derive(Debug, Clone, Copy)]
pub enum Verifiable<'a> {
    Jws(&'a Jws),
    Compact(&'a str),
    HealthCard(&'a HealthCard),
}

impl<'a> From<&'a Jws> for Verifiable<'a> {
    fn from(jws: &'a Jws) -> Self {
        Verifiable::Jws(jws)
    }
}

impl<'a> From<&'a str> for Verifiable<'a> {
    fn from(compact: &'a str) -> Self {
        Verifiable::Compact(compact)
    }
}

impl<'a> From<&'a String> for Verifiable<'a> {
    fn from(compact: &'a String) -> Self {
        Verifiable::Compact(compact.as_str())
    }
}

impl<'a> From<&'a HealthCard> for Verifiable<'a> {
    fn from(card: &'a HealthCard) -> Self {
        Verifiable::HealthCard(card)
    }
}

/// Dynamic input: only a JSON string (a compact JWS) is verifiable.
impl<'a> TryFrom<&'a Value> for Verifiable<'a> {
    type Error = VerifierError;

    fn try_from(value: &'a Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(compact) => Ok(Verifiable::Compact(compact)),
            Value::Null => Err(VerifierError::UnsupportedInput("null".to_string())),
            Value::Bool(_) => Err(VerifierError::UnsupportedInput("a boolean".to_string())),
            Value::Number(_) => Err(VerifierError::UnsupportedInput("a number".to_string())),
            Value::Array(_) => Err(VerifierError::UnsupportedInput("an array".to_string())),
            Value::Object(_) => Err(VerifierError::UnsupportedInput("an object".to_string())),
        }
    }
}

impl<'a> Verifiable<'a> {
    fn envelope(self) -> Result<Cow<'a, Jws>, VerifierError> {
        match self {
            Verifiable::Jws(jws) => Ok(Cow::Borrowed(jws)),
            Verifiable::Compact(compact) => Ok(Cow::Owned(Jws::from_compact(compact)?)),
            Verifiable::HealthCard(card) => Ok(Cow::Borrowed(card.jws())),
        }
    }

    fn issuer(self, jws: &Jws) -> Result<Cow<'a, str>, VerifierError> {
        match self {
            Verifiable::HealthCard(card) => Ok(Cow::Borrowed(card.issuer())),
            _ => Ok(Cow::Owned(unframe(jws.payload())?.iss)),
        }
    }
}

/// Verifies health card signatures against trusted and discovered keys.
#[derive(Debug)]
pub struct Verifier<R = HttpKeySetResolver> {
    keys: RwLock<KeySet>,
    resolve_keys: AtomicBool,
    resolver: R,
}

impl Verifier<HttpKeySetResolver> {
    /// Verifier with no trusted keys, resolving over HTTPS with default
    /// settings.
    pub fn new() -> Result<Self, VerifierError> {
        Self::with_config(&ResolverConfig::default())
    }

    pub fn with_config(config: &ResolverConfig) -> Result<Self, VerifierError> {
        Ok(Self::with_resolver(HttpKeySetResolver::new(config)?))
    }
}

impl<R: KeySetResolver> Verifier<R> {
    /// Verifier with no trusted keys and resolution enabled.
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            keys: RwLock::new(KeySet::new()),
            resolve_keys: AtomicBool::new(true),
            resolver,
        }
    }

    /// Seed the trusted set.
    pub fn with_keys(self, keys: impl Into<KeySet>) -> Self {
        self.keys.write().add_keys(&keys.into());
        self
    }

    /// Snapshot of the trusted keys.
    pub fn keys(&self) -> KeySet {
        self.keys.read().clone()
    }

    pub fn add_key(&self, key: Key) -> bool {
        self.keys.write().add_key(key)
    }

    pub fn add_keys(&self, keys: &KeySet) {
        self.keys.write().add_keys(keys);
    }

    pub fn remove_key(&self, key: &Key) -> Option<Key> {
        self.keys.write().remove_key(key)
    }

    pub fn remove_keys(&self, keys: &KeySet) {
        self.keys.write().remove_keys(keys);
    }

    /// Whether unknown keys are looked up at the issuer.
    pub fn resolve_keys(&self) -> bool {
        self.resolve_keys.load(Ordering::Acquire)
    }

    pub fn set_resolve_keys(&self, enabled: bool) {
        self.resolve_keys.store(enabled, Ordering::Release);
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Check the signature of a JWS, compact string, or health card.
    ///
    /// Returns `Ok(false)` for a well-formed envelope whose signature does
    /// not match the key named by its `kid`. Fails with `MissingPublicKey`
    /// when no trusted or resolved key carries that `kid`, and with
    /// `UnresolvableKeySet` when issuer discovery fails. Resolved keys are
    /// used for this call only and never added to the trusted set.
    pub async fn verify<'a>(
        &self,
        candidate: impl Into<Verifiable<'a>>,
    ) -> Result<bool, VerifierError> {
        let candidate = candidate.into();
        let jws = candidate.envelope()?;
        let kid = jws
            .kid()
            .ok_or_else(|| VerifierError::MissingPublicKey {
                kid: "<absent>".to_string(),
            })?
            .to_string();

        let trusted = self.keys.read().find_by_kid(&kid).cloned();
        if let Some(key) = trusted {
            tracing::debug!(kid = %kid, "verifying with trusted key");
            return Ok(jws.verify_with(&key)?);
        }

        if !self.resolve_keys() {
            tracing::debug!(kid = %kid, "key not trusted and resolution disabled");
            return Err(VerifierError::MissingPublicKey { kid });
        }

        let issuer = candidate.issuer(&jws)?;
        let resolved = self.resolver.resolve(&issuer).await?;
        match resolved.find_by_kid(&kid) {
            Some(key) => {
                tracing::debug!(kid = %kid, issuer = %issuer, "verifying with resolved key");
                Ok(jws.verify_with(key)?)
            }
            None => {
                tracing::warn!(kid = %kid, issuer = %issuer, "issuer key set does not contain kid");
                Err(VerifierError::MissingPublicKey { kid })
            }
        }
    }

    /// Verify a dynamically typed value, as read from a `.smart-health-card`
    /// file or a request body.
    pub async fn verify_value(&self, value: &Value) -> Result<bool, VerifierError> {
        self.verify(Verifiable::try_from(value)?).await
    }
}

static DEFAULT_VERIFIER: OnceLock<Verifier> = OnceLock::new();

/// The process-wide verifier, built from the environment on first use.
///
/// Configuration errors are returned and initialization is retried on the
/// next call.
pub fn default_verifier() -> Result<&'static Verifier, VerifierError> {
    if let Some(verifier) = DEFAULT_VERIFIER.get() {
        return Ok(verifier);
    }
    let verifier = Verifier::with_config(&ResolverConfig::from_env()?)?;
    Ok(DEFAULT_VERIFIER.get_or_init(|| verifier))
}

/// Install `verifier` as the process-wide default. Fails, handing the
/// verifier back, if a default already exists.
pub fn install_default_verifier(verifier: Verifier) -> Result<(), Verifier> {
    DEFAULT_VERIFIER.set(verifier)
}
