//! # Key Sets
//!
//! A [`KeySet`] holds at most one key per public point. Adding a key whose
//! coordinates are already present keeps the existing entry, so a private
//! key is never silently downgraded to its public half (or the reverse).
//!
//! The JWKS export contains public records only. Issuers publish this
//! document at a well-known location for verifiers to fetch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::key::{Coordinates, Jwk, Key};

/// The JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A collection of ES256 keys, deduplicated by public coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeMap<Coordinates, Key>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` unless a key with the same coordinates is present.
    /// Returns `true` if the set changed.
    pub fn add_key(&mut self, key: Key) -> bool {
        if self.keys.contains_key(key.coordinates()) {
            return false;
        }
        self.keys.insert(*key.coordinates(), key);
        true
    }

    /// Insert every key of `other`.
    pub fn add_keys(&mut self, other: &KeySet) {
        for key in other.iter() {
            self.add_key(key.clone());
        }
    }

    /// Remove the key with the same coordinates as `key`, public or private.
    pub fn remove_key(&mut self, key: &Key) -> Option<Key> {
        self.keys.remove(key.coordinates())
    }

    /// Remove every key of `other`.
    pub fn remove_keys(&mut self, other: &KeySet) {
        for key in other.iter() {
            self.remove_key(key);
        }
    }

    /// True when a key with the same coordinates is present.
    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains_key(key.coordinates())
    }

    pub fn find_by_kid(&self, kid: &str) -> Option<&Key> {
        self.keys.values().find(|k| k.kid() == kid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.values()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Export every key as stored; private keys carry `d`.
    pub fn to_jwks(&self) -> Jwks {
        Jwks {
            keys: self.iter().map(Key::to_jwk).collect(),
        }
    }

    /// Export public records only, for publication at a well-known URL.
    pub fn to_public_jwks(&self) -> Jwks {
        Jwks {
            keys: self.iter().map(|k| k.public_key().to_jwk()).collect(),
        }
    }

    /// Import every record of a JWKS document.
    pub fn from_jwks(jwks: &Jwks) -> Result<Self, CryptoError> {
        let mut set = Self::new();
        for jwk in &jwks.keys {
            set.add_key(Key::from_jwk(jwk)?);
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String, CryptoError> {
        Ok(serde_json::to_string(&self.to_jwks())?)
    }

    pub fn from_json(text: &str) -> Result<Self, CryptoError> {
        let jwks: Jwks = serde_json::from_str(text)?;
        Self::from_jwks(&jwks)
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        let mut set = Self::new();
        set.add_key(key);
        set
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.add_key(key);
        }
        set
    }
}

impl Extend<Key> for KeySet {
    fn extend<I: IntoIterator<Item = Key>>(&mut self, iter: I) {
        for key in iter {
            self.add_key(key);
        }
    }
}
