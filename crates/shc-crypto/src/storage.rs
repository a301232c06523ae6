//! # Key File Persistence
//!
//! Issuer keys are stored as a private JWK in a single JSON file. The file
//! is created on first use with owner-only permissions on Unix.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::CryptoError;
use crate::key::Key;

/// Load the private key stored at `path`, generating and writing a new one
/// if the file does not exist.
///
/// A file holding a public-only key is rejected: issuers need to sign.
pub fn load_or_create(path: impl AsRef<Path>) -> Result<Key, CryptoError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => {
            let key = Key::from_json(&text)?;
            if !key.is_private() {
                return Err(CryptoError::InvalidKey(format!(
                    "{} holds a public key; a private key is required",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), kid = %key.kid(), "loaded issuer key");
            Ok(key)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let key = Key::generate()?;
            write_new(path, &key)?;
            tracing::info!(path = %path.display(), kid = %key.kid(), "generated issuer key");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `key` as a private JWK to a file that must not already exist.
pub fn write_new(path: impl AsRef<Path>, key: &Key) -> Result<(), CryptoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let json = serde_json::to_string_pretty(&key.to_jwk())?;
    let mut file = options.open(path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
