//! # shc-core — Foundational Types for SMART Health Cards
//!
//! This crate is the leaf of the workspace. It holds the pieces every other
//! crate needs and that carry no key material:
//!
//! 1. **`CanonicalBytes`.** JCS (RFC 8785) serialization. Key thumbprints
//!    are computed over canonical bytes only, so two implementations hashing
//!    the same `{crv, kty, x, y}` members always agree.
//!
//! 2. **base64url without padding.** The only binary-to-text encoding used by
//!    the compact envelope and JWK records.
//!
//! 3. **Raw DEFLATE.** Credential payloads are compressed without zlib
//!    header or checksum.
//!
//! 4. **Clinical bundle model.** A `Bundle` wraps the FHIR JSON tree and
//!    exposes a tagged-variant element visitor used by minification.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `shc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod compression;
pub mod encoding;
pub mod error;
pub mod fhir;

pub use canonical::CanonicalBytes;
pub use compression::{compress, decompress};
pub use encoding::{b64url_decode, b64url_encode};
pub use error::{BundleError, CanonicalizationError, CompressionError};
pub use fhir::{Bundle, Element, ElementKind};
