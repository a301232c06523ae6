//! # shc-qr — Numeric QR Transport
//!
//! A compact JWS is carried through QR codes in numeric mode. Each
//! character becomes two decimal digits (`code - 45`), and long envelopes
//! are split into balanced parts framed as `shc:/i/n/<digits>`.
//!
//! - **Chunking** (`chunking.rs`): `split_jws`, the numeric codec, and
//!   `jws_to_qr_chunks` / `qr_chunks_to_jws`.
//! - **QrCodes** (`qr_codes.rs`): an ordered collection of framed chunks
//!   built from, or reassembled into, a `Jws`.
//!
//! Rendering a chunk into a raster image is left to a barcode library.

pub mod chunking;
pub mod error;
pub mod qr_codes;

pub use chunking::{
    decode_numeric, encode_numeric, jws_to_qr_chunks, qr_chunks_to_jws, split_jws,
    MAX_CHUNK_LEN, MAX_SINGLE_JWS_LEN,
};
pub use error::ChunkError;
pub use qr_codes::{Chunk, QrCodes};
