//! # Cryptographic Error Types
//!
//! Structured errors for key handling and the JWS envelope.

use thiserror::Error;

/// Errors from key and envelope operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A key is unusable for the requested operation: a public key where a
    /// private key is required, or coordinates that are not a P-256 point.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A JWK record is malformed or names an unsupported key type or curve.
    #[error("invalid JWK: {0}")]
    Jwk(String),

    /// A base64url segment could not be decoded.
    #[error("base64url decode error in {context}: {source}")]
    Base64 {
        context: &'static str,
        source: base64::DecodeError,
    },

    /// The compact serialization is not `header.payload.signature`.
    #[error("malformed JWS: {0}")]
    JwsFormat(String),

    /// The envelope has no signing key and no parsed signature.
    #[error("JWS has no signature")]
    MissingSignature,

    /// JSON (de)serialization of a header or key record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Thumbprint canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] shc_core::CanonicalizationError),

    /// Key file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_display() {
        let err = CryptoError::InvalidKey("public key cannot sign".to_string());
        assert!(format!("{err}").contains("public key cannot sign"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = CryptoError::from(io_err);
        assert!(format!("{err}").contains("file missing"));
    }
}
