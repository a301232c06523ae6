//! # ES256 Keys, Thumbprints, and JWK Records
//!
//! A [`Key`] is a P-256 public point with an optional private scalar. Keys
//! are identified by their RFC 7638 thumbprint: the SHA-256 of the
//! canonical JSON object `{crv, kty, x, y}`, base64url-encoded without
//! padding. Verifiers look keys up by this `kid`, so it must be
//! reproducible byte-for-byte by any implementation.
//!
//! ## Security Invariants
//!
//! - A public-only export never carries `d`.
//! - Importing a record with `d` checks that the scalar matches `x`/`y`.
//! - Decoded private scalars live in `Zeroizing` buffers.
//! - `Debug` output shows the `kid` only.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use shc_core::{b64url_decode, b64url_encode, CanonicalBytes};

use crate::error::CryptoError;

/// JWK `kty` for elliptic-curve keys.
pub const KEY_TYPE: &str = "EC";
/// JWK `crv` for P-256.
pub const CURVE: &str = "P-256";
/// JWS algorithm used for health cards.
pub const ALGORITHM: &str = "ES256";
/// JWK `use` for signing keys.
pub const KEY_USE: &str = "sig";

/// Affine coordinates of a P-256 public point.
///
/// Ordering and hashing follow the raw coordinate bytes, which makes this
/// the natural key for deduplicating key sets.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinates {
    x: [u8; 32],
    y: [u8; 32],
}

impl Coordinates {
    pub fn x(&self) -> &[u8; 32] {
        &self.x
    }

    pub fn y(&self) -> &[u8; 32] {
        &self.y
    }

    /// `x` as unpadded base64url.
    pub fn x_b64(&self) -> String {
        b64url_encode(self.x)
    }

    /// `y` as unpadded base64url.
    pub fn y_b64(&self) -> String {
        b64url_encode(self.y)
    }

    fn from_verifying_key(vk: &VerifyingKey) -> Result<Self, CryptoError> {
        let point = vk.to_encoded_point(false);
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => {
                let mut coords = Self {
                    x: [0u8; 32],
                    y: [0u8; 32],
                };
                coords.x.copy_from_slice(x);
                coords.y.copy_from_slice(y);
                Ok(coords)
            }
            _ => Err(CryptoError::InvalidKey(
                "public point has no affine coordinates".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let x = self.x_b64();
        write!(f, "Coordinates(x={}...)", &x[..8])
    }
}

/// Compute the RFC 7638 thumbprint of a P-256 public key.
pub fn thumbprint(coordinates: &Coordinates) -> Result<String, CryptoError> {
    let members = serde_json::json!({
        "crv": CURVE,
        "kty": KEY_TYPE,
        "x": coordinates.x_b64(),
        "y": coordinates.y_b64(),
    });
    let canonical = CanonicalBytes::new(&members)?;
    Ok(b64url_encode(Sha256::digest(canonical.as_bytes())))
}

// ---------------------------------------------------------------------------
// JWK record
// ---------------------------------------------------------------------------

/// JSON Web Key record for an ES256 key.
///
/// Exported records always carry `use`, `alg`, and `kid`; imports tolerate
/// their absence because they are derivable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("kid", &self.kid)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// An ES256 key. Holds a private scalar when it can sign.
#[derive(Clone)]
pub struct Key {
    verifying_key: VerifyingKey,
    signing_key: Option<SigningKey>,
    coordinates: Coordinates,
    kid: String,
}

impl Key {
    /// Generate a new private key using the OS CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Wrap an existing `p256` signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Result<Self, CryptoError> {
        let verifying_key = *signing_key.verifying_key();
        let mut key = Self::from_verifying_key(verifying_key)?;
        key.signing_key = Some(signing_key);
        Ok(key)
    }

    /// Wrap an existing `p256` verifying key.
    pub fn from_verifying_key(verifying_key: VerifyingKey) -> Result<Self, CryptoError> {
        let coordinates = Coordinates::from_verifying_key(&verifying_key)?;
        let kid = thumbprint(&coordinates)?;
        Ok(Self {
            verifying_key,
            signing_key: None,
            coordinates,
            kid,
        })
    }

    /// Import a JWK record. A record with `d` yields a private key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, CryptoError> {
        if jwk.kty != KEY_TYPE {
            return Err(CryptoError::Jwk(format!(
                "unsupported kty {:?}, expected {KEY_TYPE}",
                jwk.kty
            )));
        }
        if jwk.crv != CURVE {
            return Err(CryptoError::Jwk(format!(
                "unsupported crv {:?}, expected {CURVE}",
                jwk.crv
            )));
        }

        let x = decode_coordinate(&jwk.x, "x")?;
        let y = decode_coordinate(&jwk.y, "y")?;
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&x),
            FieldBytes::from_slice(&y),
            false,
        );
        let verifying_key = VerifyingKey::from_encoded_point(&point)
            .map_err(|_| CryptoError::InvalidKey("x/y is not a point on P-256".to_string()))?;

        let key = match &jwk.d {
            None => Self::from_verifying_key(verifying_key)?,
            Some(d) => {
                let scalar = Zeroizing::new(b64url_decode(d).map_err(|source| {
                    CryptoError::Base64 {
                        context: "jwk d",
                        source,
                    }
                })?);
                let signing_key = SigningKey::from_slice(&scalar)
                    .map_err(|_| CryptoError::InvalidKey("d is not a P-256 scalar".to_string()))?;
                if *signing_key.verifying_key() != verifying_key {
                    return Err(CryptoError::InvalidKey(
                        "d does not match the public coordinates".to_string(),
                    ));
                }
                Self::from_signing_key(signing_key)?
            }
        };

        if let Some(declared) = &jwk.kid {
            if declared != &key.kid {
                tracing::warn!(
                    declared = %declared,
                    computed = %key.kid,
                    "JWK kid does not match its thumbprint; using the thumbprint"
                );
            }
        }
        Ok(key)
    }

    /// Parse a JWK from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CryptoError> {
        let jwk: Jwk = serde_json::from_str(text)?;
        Self::from_jwk(&jwk)
    }

    /// Export as a JWK record. Includes `d` only for private keys.
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: KEY_TYPE.to_string(),
            crv: CURVE.to_string(),
            key_use: Some(KEY_USE.to_string()),
            alg: Some(ALGORITHM.to_string()),
            kid: Some(self.kid.clone()),
            x: self.coordinates.x_b64(),
            y: self.coordinates.y_b64(),
            d: self
                .signing_key
                .as_ref()
                .map(|sk| b64url_encode(sk.to_bytes())),
        }
    }

    /// The public half of this key.
    pub fn public_key(&self) -> Key {
        Self {
            verifying_key: self.verifying_key,
            signing_key: None,
            coordinates: self.coordinates,
            kid: self.kid.clone(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.signing_key.is_some()
    }

    /// The RFC 7638 thumbprint.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// True when both keys denote the same public point.
    pub fn same_key(&self, other: &Key) -> bool {
        self.coordinates == other.coordinates
    }

    /// Sign `message` with ES256, returning the 64-byte `r || s` form used by JWS.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = self.signing_key.as_ref().ok_or_else(|| {
            CryptoError::InvalidKey(format!("key {} is public and cannot sign", self.kid))
        })?;
        let signature: Signature = signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    /// Verify a 64-byte `r || s` ES256 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify(message, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.coordinates == other.coordinates && self.is_private() == other.is_private()
    }
}

impl Eq for Key {}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visibility = if self.is_private() { "private" } else { "public" };
        write!(f, "Key({}, {visibility})", self.kid)
    }
}

fn decode_coordinate(text: &str, name: &'static str) -> Result<[u8; 32], CryptoError> {
    let bytes = b64url_decode(text).map_err(|source| CryptoError::Base64 {
        context: name,
        source,
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CryptoError::InvalidKey(format!(
            "coordinate {name} must be 32 bytes, got {}",
            b.len()
        ))
    })
}
