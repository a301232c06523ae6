//! # Error Types — Leaf Error Hierarchy
//!
//! Errors raised by the codecs and the bundle model in this crate. All use
//! `thiserror`; higher crates wrap them with `#[from]`.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error while deflating or inflating a payload.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The deflate stream could not be written.
    #[error("deflate failed: {0}")]
    Deflate(std::io::Error),

    /// The input is not a valid raw deflate stream.
    #[error("inflate failed: {0}")]
    Inflate(std::io::Error),
}

/// Error in the clinical bundle model or its traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// The value handed to a payload is not a FHIR `Bundle`.
    #[error("payload must be a FHIR Bundle, got {0}")]
    NotABundle(String),

    /// A `Reference.reference` does not denote any entry in the bundle.
    #[error("unresolvable bundle reference: {0}")]
    UnresolvableReference(String),
}
