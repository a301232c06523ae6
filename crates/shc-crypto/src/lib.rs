//! # shc-crypto — Key Material and the Signed Envelope
//!
//! - **Key** (`key.rs`): ES256 (ECDSA over P-256 with SHA-256) keys, public
//!   or private, their RFC 7638 thumbprint (`kid`), and the JWK record they
//!   import from and export to.
//! - **KeySet** (`key_set.rs`): a coordinate-deduplicated collection of keys
//!   with JWKS import/export.
//! - **Storage** (`storage.rs`): load-or-create of a private key file.
//! - **JWS** (`jws.rs`): the three-segment compact envelope whose signature
//!   is re-derived whenever header, payload, or key changes.
//!
//! ## Crate Policy
//!
//! - Depends only on `shc-core` internally.
//! - Elliptic-curve arithmetic and hashing are delegated to `p256` and
//!   `sha2`; nothing here reimplements a primitive.
//! - Private scalars never appear in `Debug` output.

pub mod error;
pub mod jws;
pub mod key;
pub mod key_set;
pub mod storage;

pub use error::CryptoError;
pub use jws::Jws;
pub use key::{Coordinates, Jwk, Key};
pub use key_set::{Jwks, KeySet};
