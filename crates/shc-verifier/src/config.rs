//! Key resolution configuration.
//!
//! Defaults suit production issuers. Override via environment variables or
//! explicit construction for tests.

use std::time::Duration;

/// Default request timeout for key-set discovery.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path appended to the issuer URL to locate its key set.
pub const DEFAULT_JWKS_PATH: &str = "/.well-known/jwks.json";

/// Configuration for issuer key-set discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on one key-set fetch, connect through body.
    pub timeout: Duration,
    /// Path appended to the issuer URL.
    pub jwks_path: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            jwks_path: DEFAULT_JWKS_PATH.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SHC_RESOLVER_TIMEOUT_SECS` (default: 10, must be positive)
    /// - `SHC_JWKS_PATH` (default: `/.well-known/jwks.json`, must start with `/`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout = match std::env::var("SHC_RESOLVER_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => DEFAULT_TIMEOUT,
        };
        let jwks_path = match std::env::var("SHC_JWKS_PATH") {
            Ok(raw) => parse_path(raw)?,
            Err(_) => DEFAULT_JWKS_PATH.to_string(),
        };
        Ok(Self { timeout, jwks_path })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

fn parse_path(raw: String) -> Result<String, ConfigError> {
    if raw.starts_with('/') {
        Ok(raw)
    } else {
        Err(ConfigError::InvalidPath(raw))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SHC_RESOLVER_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
    #[error("SHC_JWKS_PATH must start with '/', got {0:?}")]
    InvalidPath(String),
    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ResolverConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.jwks_path, "/.well-known/jwks.json");
    }

    #[test]
    fn timeout_must_be_positive_integer() {
        assert_eq!(parse_timeout("5").unwrap(), Duration::from_secs(5));
        assert!(matches!(parse_timeout("0"), Err(ConfigError::InvalidTimeout(_))));
        assert!(matches!(parse_timeout("ten"), Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn path_must_be_absolute() {
        assert_eq!(parse_path("/jwks".to_string()).unwrap(), "/jwks");
        assert!(matches!(
            parse_path("jwks".to_string()),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn with_timeout_overrides() {
        let cfg = ResolverConfig::default().with_timeout(Duration::from_millis(250));
        assert_eq!(cfg.timeout, Duration::from_millis(250));
    }
}
