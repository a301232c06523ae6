//! # shc-verifier — Health Card Verification
//!
//! - **Verifier** (`verifier.rs`): trusted key set, per-`kid` lookup, and
//!   the process-wide default instance.
//! - **Resolver** (`resolver.rs`): discovery of an issuer's published key
//!   set over HTTPS with a bounded timeout.
//! - **Config** (`config.rs`): resolver settings from the environment.
//!
//! ## Crate Policy
//!
//! - A bad signature is `Ok(false)`; a missing or unreachable key is an
//!   error. Callers can tell "forged" from "unknown".
//! - Resolved keys are used for the current call only.

pub mod config;
pub mod error;
pub mod resolver;
pub mod verifier;

pub use config::{ConfigError, ResolverConfig};
pub use error::VerifierError;
pub use resolver::{HttpKeySetResolver, JwksLocator, KeySetResolver, WellKnownJwks};
pub use verifier::{default_verifier, install_default_verifier, Verifiable, Verifier};
