//! # Payload and Credential Framing
//!
//! A [`Payload`] pairs a clinical bundle with an issuer and a profile. Its
//! [`Credential`] is the JSON claim a health card signs:
//!
//! ```json
//! {"iss": "...", "nbf": 1620992383,
//!  "vc": {"type": ["https://smarthealth.cards#health-card"],
//!         "credentialSubject": {"fhirVersion": "4.0.1", "fhirBundle": {...}}}}
//! ```
//!
//! [`frame`] serializes and raw-deflates a credential; [`unframe`] is its
//! inverse and rejects anything that inflates to JSON without a
//! `vc.credentialSubject.fhirBundle`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use shc_core::{compress, decompress, Bundle};

use crate::error::CredentialError;
use crate::minify::minify;
use crate::profile::PayloadProfile;

/// The signed claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub iss: String,
    /// Not-before, in seconds since the Unix epoch.
    #[serde(deserialize_with = "seconds")]
    pub nbf: i64,
    pub vc: VcClaim,
}

/// The `vc` member of a [`Credential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcClaim {
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    #[serde(rename = "fhirVersion")]
    pub fhir_version: String,
    #[serde(rename = "fhirBundle")]
    pub fhir_bundle: Bundle,
}

impl Credential {
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.nbf, 0)
    }

    pub fn types(&self) -> &[String] {
        &self.vc.types
    }

    pub fn fhir_version(&self) -> &str {
        &self.vc.credential_subject.fhir_version
    }

    pub fn bundle(&self) -> &Bundle {
        &self.vc.credential_subject.fhir_bundle
    }
}

/// Published issuers emit fractional `nbf` values; they are truncated to
/// whole seconds.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(f.floor() as i64)
        }
        _ => Err(serde::de::Error::custom(format!(
            "nbf {number} is not a timestamp"
        ))),
    }
}

/// A clinical bundle ready to become a credential.
#[derive(Debug, Clone)]
pub struct Payload {
    profile: Arc<PayloadProfile>,
    issuer: String,
    bundle: Bundle,
}

impl Payload {
    pub fn new(bundle: Bundle, issuer: impl Into<String>, profile: Arc<PayloadProfile>) -> Self {
        Self {
            profile,
            issuer: issuer.into(),
            bundle,
        }
    }

    /// Build from untyped JSON. Anything but a FHIR Bundle is an
    /// [`CredentialError::InvalidPayload`].
    pub fn from_value(
        value: Value,
        issuer: impl Into<String>,
        profile: Arc<PayloadProfile>,
    ) -> Result<Self, CredentialError> {
        Ok(Self::new(Bundle::from_value(value)?, issuer, profile))
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn profile(&self) -> &PayloadProfile {
        &self.profile
    }

    /// The bundle after minification under this payload's profile.
    pub fn minified_bundle(&self) -> Result<Bundle, CredentialError> {
        minify(&self.bundle, &self.profile)
    }

    /// The credential with a minified bundle, not before now.
    pub fn credential(&self) -> Result<Credential, CredentialError> {
        Ok(self.credential_with(self.minified_bundle()?, Utc::now()))
    }

    /// The credential with the bundle as given. Useful for inspecting what
    /// minification removed; never sign this.
    pub fn credential_unfiltered(&self) -> Credential {
        self.credential_with(self.bundle.clone(), Utc::now())
    }

    /// Minify, frame, and compress.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CredentialError> {
        frame(&self.credential()?)
    }

    fn credential_with(&self, bundle: Bundle, not_before: DateTime<Utc>) -> Credential {
        Credential {
            iss: self.issuer.clone(),
            nbf: not_before.timestamp(),
            vc: VcClaim {
                types: self.profile.types().to_vec(),
                credential_subject: CredentialSubject {
                    fhir_version: self.profile.fhir_version().to_string(),
                    fhir_bundle: bundle,
                },
            },
        }
    }
}

/// Serialize and raw-deflate a credential.
pub fn frame(credential: &Credential) -> Result<Vec<u8>, CredentialError> {
    let json = serde_json::to_vec(credential)?;
    Ok(compress(&json)?)
}

/// Inflate and parse a credential.
pub fn unframe(bytes: &[u8]) -> Result<Credential, CredentialError> {
    let json = decompress(bytes)
        .map_err(|e| CredentialError::InvalidCredential(format!("payload does not inflate: {e}")))?;
    let value: Value = serde_json::from_slice(&json)
        .map_err(|e| CredentialError::InvalidCredential(format!("payload is not JSON: {e}")))?;
    if value.pointer("/vc/credentialSubject/fhirBundle").is_none() {
        return Err(CredentialError::InvalidCredential(
            "missing vc.credentialSubject.fhirBundle".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| CredentialError::InvalidCredential(e.to_string()))
}
