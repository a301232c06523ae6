//! # Credential Error Types

use thiserror::Error;

use shc_core::{BundleError, CompressionError};
use shc_crypto::CryptoError;
use shc_qr::ChunkError;

/// Errors raised while building, framing, issuing, or reading a credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The payload was constructed from something that is not a FHIR Bundle.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A decompressed payload lacks the expected credential framing.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// A reference in the bundle does not resolve to any entry.
    #[error("bundle reference {url} does not resolve to an entry in the bundle")]
    InvalidBundleReference { url: String },

    /// No payload profile is registered under this identifier.
    #[error("unknown payload profile: {0}")]
    UnknownProfile(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<BundleError> for CredentialError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::NotABundle(what) => {
                Self::InvalidPayload(format!("expected a FHIR Bundle, got {what}"))
            }
            BundleError::UnresolvableReference(url) => Self::InvalidBundleReference { url },
        }
    }
}
