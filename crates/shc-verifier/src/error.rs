//! # Verifier Error Types
//!
//! Trust failures are split in two: [`VerifierError::MissingPublicKey`]
//! means every available source was consulted and none holds the key;
//! [`VerifierError::UnresolvableKeySet`] means the discovery channel itself
//! failed and the answer is unknown.

use thiserror::Error;

use shc_crypto::CryptoError;
use shc_vc::CredentialError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum VerifierError {
    /// No trusted or resolvable key carries this `kid`.
    #[error("no public key found for kid {kid}")]
    MissingPublicKey { kid: String },

    /// Fetching the issuer's key set failed or timed out.
    #[error("could not resolve key set for issuer {issuer}: {reason}")]
    UnresolvableKeySet { issuer: String, reason: String },

    /// The value handed to `verify` is not an envelope, compact string, or
    /// health card.
    #[error("cannot verify {0}: expected a JWS, its compact string, or a health card")]
    UnsupportedInput(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_errors_are_distinct() {
        let missing = VerifierError::MissingPublicKey {
            kid: "abc".to_string(),
        };
        let unresolvable = VerifierError::UnresolvableKeySet {
            issuer: "https://example.org".to_string(),
            reason: "timed out".to_string(),
        };
        assert!(format!("{missing}").contains("abc"));
        assert!(format!("{unresolvable}").contains("timed out"));
        assert!(!matches!(unresolvable, VerifierError::MissingPublicKey { .. }));
    }
}
