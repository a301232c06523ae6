//! # Error Types — Chunking and Reassembly
//!
//! Failures while encoding an envelope into numeric QR chunks or joining
//! scanned chunks back into one.

use thiserror::Error;

/// Errors from chunking, framing, and reassembly.
#[derive(Error, Debug)]
pub enum ChunkError {
    /// A character of the envelope cannot be expressed as two digits.
    #[error("character {ch:?} at position {position} is outside the numeric QR alphabet")]
    InvalidCharacter { ch: char, position: usize },

    /// The chunk does not start with `shc:/` or its `i/n/` prefix is malformed.
    #[error("malformed chunk prefix: {0}")]
    MalformedPrefix(String),

    /// The numeric body has odd length, a non-digit, or a pair above 99.
    #[error("malformed numeric payload: {0}")]
    MalformedNumeric(String),

    /// The supplied chunks do not form one complete `1..=n` sequence.
    #[error("inconsistent chunk set: {0}")]
    InconsistentSet(String),

    /// No chunks were supplied.
    #[error("no chunks to join")]
    Empty,

    /// The envelope could not be serialized or parsed.
    #[error(transparent)]
    Envelope(#[from] shc_crypto::CryptoError),
}
