//! # Health Card
//!
//! The consumer-facing artifact: one signed envelope, its decoded
//! credential, and the QR chunks that carry it. The credential is decoded
//! and the chunks are computed once, at construction.

use serde_json::{json, Value};

use shc_core::Bundle;
use shc_crypto::Jws;
use shc_qr::QrCodes;

use crate::error::CredentialError;
use crate::payload::{unframe, Credential};

/// A signed SMART Health Card.
#[derive(Debug, Clone)]
pub struct HealthCard {
    jws: Jws,
    compact: String,
    credential: Credential,
    qr_codes: QrCodes,
}

impl HealthCard {
    /// Wrap a signed envelope. Fails with `InvalidCredential` if the payload
    /// does not inflate to a credential.
    pub fn from_jws(jws: Jws) -> Result<Self, CredentialError> {
        let compact = jws.to_compact()?;
        let credential = unframe(jws.payload())?;
        let qr_codes = QrCodes::from_compact(&compact)?;
        Ok(Self {
            jws,
            compact,
            credential,
            qr_codes,
        })
    }

    /// Parse a compact envelope string.
    pub fn from_compact(compact: &str) -> Result<Self, CredentialError> {
        Self::from_jws(Jws::from_compact(compact)?)
    }

    /// Reassemble from scanned QR chunk text, in any order.
    pub fn from_qr_chunks<S: AsRef<str>>(chunks: &[S]) -> Result<Self, CredentialError> {
        Self::from_jws(QrCodes::new(chunks)?.to_jws()?)
    }

    /// Every card in a `.smart-health-card` file body
    /// (`{"verifiableCredential": [...]}`).
    pub fn from_file_json(value: &Value) -> Result<Vec<Self>, CredentialError> {
        let list = value
            .get("verifiableCredential")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                CredentialError::InvalidCredential("missing verifiableCredential array".to_string())
            })?;
        list.iter()
            .map(|item| match item.as_str() {
                Some(compact) => Self::from_compact(compact),
                None => Err(CredentialError::InvalidCredential(
                    "verifiableCredential items must be strings".to_string(),
                )),
            })
            .collect()
    }

    pub fn jws(&self) -> &Jws {
        &self.jws
    }

    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn issuer(&self) -> &str {
        self.credential.issuer()
    }

    pub fn bundle(&self) -> &Bundle {
        self.credential.bundle()
    }

    /// Resources of `resource_type` (all when `None`) satisfying `predicate`.
    pub fn resources<P>(&self, resource_type: Option<&str>, predicate: P) -> Vec<&Value>
    where
        P: Fn(&Value) -> bool,
    {
        self.bundle()
            .resources()
            .filter(|r| match resource_type {
                Some(t) => r.get("resourceType").and_then(Value::as_str) == Some(t),
                None => true,
            })
            .filter(|r| predicate(*r))
            .collect()
    }

    /// Every resource of `resource_type`.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Value> {
        self.resources(Some(resource_type), |_| true)
    }

    /// The first resource of `resource_type` satisfying `predicate`.
    pub fn resource<P>(&self, resource_type: Option<&str>, predicate: P) -> Option<&Value>
    where
        P: Fn(&Value) -> bool,
    {
        self.resources(resource_type, predicate).into_iter().next()
    }

    pub fn qr_codes(&self) -> &QrCodes {
        &self.qr_codes
    }

    /// QR text for chunk `ordinal` (1-based).
    pub fn chunk_text(&self, ordinal: usize) -> Option<&str> {
        self.qr_codes.chunk_text(ordinal)
    }

    /// The `.smart-health-card` file body.
    pub fn to_json(&self) -> Value {
        json!({ "verifiableCredential": [self.compact] })
    }
}
