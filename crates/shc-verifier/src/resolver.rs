//! # Issuer Key Discovery
//!
//! A [`KeySetResolver`] turns an issuer identifier into that issuer's
//! published [`KeySet`]. The HTTP implementation locates the document with
//! a [`JwksLocator`] (by default `{iss}/.well-known/jwks.json`) and fetches
//! it with a bounded timeout.
//!
//! Every transport failure, non-success status, or malformed document
//! surfaces as [`VerifierError::UnresolvableKeySet`]. Resolved sets are not
//! cached and failed fetches are not retried.

use std::future::Future;

use reqwest::Client;
use url::Url;

use shc_crypto::{Jwks, KeySet};

use crate::config::{ConfigError, ResolverConfig, DEFAULT_JWKS_PATH};
use crate::error::VerifierError;

/// Fetches the key set an issuer publishes.
pub trait KeySetResolver: Send + Sync {
    fn resolve(&self, issuer: &str) -> impl Future<Output = Result<KeySet, VerifierError>> + Send;
}

/// Maps an issuer identifier to the URL of its JWKS document.
pub trait JwksLocator: Send + Sync {
    fn locate(&self, issuer: &str) -> Result<Url, VerifierError>;
}

/// Appends a fixed path to the issuer URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownJwks {
    path: String,
}

impl WellKnownJwks {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for WellKnownJwks {
    fn default() -> Self {
        Self::new(DEFAULT_JWKS_PATH)
    }
}

impl JwksLocator for WellKnownJwks {
    fn locate(&self, issuer: &str) -> Result<Url, VerifierError> {
        let joined = format!("{}{}", issuer.trim_end_matches('/'), self.path);
        let url = Url::parse(&joined).map_err(|e| VerifierError::UnresolvableKeySet {
            issuer: issuer.to_string(),
            reason: format!("invalid key set URL {joined}: {e}"),
        })?;
        match url.scheme() {
            "https" | "http" => Ok(url),
            other => Err(VerifierError::UnresolvableKeySet {
                issuer: issuer.to_string(),
                reason: format!("unsupported scheme {other}"),
            }),
        }
    }
}

/// Resolves key sets over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpKeySetResolver<L = WellKnownJwks> {
    http: Client,
    locator: L,
}

impl HttpKeySetResolver<WellKnownJwks> {
    /// Build a resolver that locates documents under `config.jwks_path`.
    pub fn new(config: &ResolverConfig) -> Result<Self, VerifierError> {
        Self::with_locator(config, WellKnownJwks::new(config.jwks_path.clone()))
    }
}

impl<L: JwksLocator> HttpKeySetResolver<L> {
    pub fn with_locator(config: &ResolverConfig, locator: L) -> Result<Self, VerifierError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http, locator })
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }
}

impl<L: JwksLocator> KeySetResolver for HttpKeySetResolver<L> {
    async fn resolve(&self, issuer: &str) -> Result<KeySet, VerifierError> {
        let url = self.locator.locate(issuer)?;
        let unresolvable = |reason: String| {
            tracing::warn!(issuer, %reason, "key set resolution failed");
            VerifierError::UnresolvableKeySet {
                issuer: issuer.to_string(),
                reason,
            }
        };

        tracing::debug!(issuer, url = %url, "fetching issuer key set");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| unresolvable(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(unresolvable(format!("GET {url} returned {status}")));
        }

        let jwks: Jwks = resp
            .json()
            .await
            .map_err(|e| unresolvable(format!("malformed key set at {url}: {e}")))?;
        let keys = KeySet::from_jwks(&jwks)
            .map_err(|e| unresolvable(format!("invalid key in set at {url}: {e}")))?;

        tracing::info!(issuer, keys = keys.len(), "resolved issuer key set");
        Ok(keys)
    }
}
