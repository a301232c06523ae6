//! # Raw DEFLATE
//!
//! Credential payloads are compressed with DEFLATE and no zlib header or
//! Adler-32 trailer (`zip: "DEF"` in the JWS header). `compress` and
//! `decompress` are exact inverses.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::CompressionError;

/// Compress bytes into a raw deflate stream at the best compression level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).map_err(CompressionError::Deflate)?;
    encoder.finish().map_err(CompressionError::Deflate)
}

/// Inflate a raw deflate stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(CompressionError::Inflate)?;
    Ok(out)
}
