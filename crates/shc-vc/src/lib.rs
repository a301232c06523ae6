//! # shc-vc — SMART Health Card Credentials
//!
//! - **Profiles** (`profile.rs`): immutable per-kind configuration (types,
//!   FHIR version, attribute rules) composed from the base health card, and
//!   a registry keyed by kind.
//! - **Minification** (`minify.rs`): the deterministic de-identifying copy
//!   of a bundle, with `resource:<N>` URLs and attribute filtering.
//! - **Payload** (`payload.rs`): the `{iss, nbf, vc}` credential and its
//!   raw-deflate framing.
//! - **Issuer** (`issuer.rs`): signs payloads into compact JWS envelopes.
//! - **Health Card** (`health_card.rs`): the decoded, queryable artifact
//!   with its QR chunks.
//!
//! ## Crate Policy
//!
//! - Depends on `shc-core`, `shc-crypto`, and `shc-qr` internally.
//! - The input bundle is never mutated; minification works on a copy.
//! - Minification is fail-fast: the first unresolvable reference aborts.

pub mod error;
pub mod health_card;
pub mod issuer;
pub mod minify;
pub mod payload;
pub mod profile;

pub use error::CredentialError;
pub use health_card::HealthCard;
pub use issuer::Issuer;
pub use minify::minify;
pub use payload::{frame, unframe, Credential, CredentialSubject, Payload, VcClaim};
pub use profile::{PayloadProfile, ProfileBuilder, ProfileRegistry, TypeSelector};
