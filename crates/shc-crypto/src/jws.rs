//! # Compact JWS Envelope
//!
//! `base64url(header) "." base64url(payload) "." base64url(signature)`, with
//! an ES256 signature over the first two segments joined by `.`.
//!
//! An envelope that carries a private key keeps its signature current:
//! changing the header, the payload, or the key re-signs immediately. An
//! envelope without a key has no signature unless it was parsed from a
//! compact string, and any edit to a parsed envelope drops the parsed
//! signature so a stale one is never emitted.
//!
//! Parsed segments are retained verbatim. Verification must run over the
//! exact bytes the issuer signed, and re-serializing a JSON header is not
//! guaranteed to reproduce them.

use serde_json::{Map, Value};

use shc_core::{b64url_decode, b64url_encode};

use crate::error::CryptoError;
use crate::key::Key;

/// A JWS in compact form.
#[derive(Debug, Clone)]
pub struct Jws {
    header: Map<String, Value>,
    header_segment: String,
    payload: Vec<u8>,
    payload_segment: String,
    key: Option<Key>,
    signature: Option<Vec<u8>>,
}

impl Jws {
    /// Build an envelope. With a private key the signature is computed now
    /// and the header's `kid` is set to the key's thumbprint.
    pub fn new(
        header: Map<String, Value>,
        payload: impl Into<Vec<u8>>,
        key: Option<Key>,
    ) -> Result<Self, CryptoError> {
        let payload = payload.into();
        let mut jws = Self {
            header_segment: String::new(),
            payload_segment: b64url_encode(&payload),
            header,
            payload,
            key: None,
            signature: None,
        };
        match key {
            Some(key) => jws.set_key(key)?,
            None => jws.header_segment = encode_header(&jws.header)?,
        }
        Ok(jws)
    }

    /// Parse `header.payload.signature`. Exactly three segments are required.
    pub fn from_compact(compact: &str) -> Result<Self, CryptoError> {
        let segments: Vec<&str> = compact.trim().split('.').collect();
        let [header_segment, payload_segment, signature_segment] = segments[..] else {
            return Err(CryptoError::JwsFormat(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let header_bytes = decode(header_segment, "JWS header")?;
        let header = match serde_json::from_slice::<Value>(&header_bytes)? {
            Value::Object(map) => map,
            other => {
                return Err(CryptoError::JwsFormat(format!(
                    "header must be a JSON object, found {other}"
                )))
            }
        };
        let payload = decode(payload_segment, "JWS payload")?;
        let signature = decode(signature_segment, "JWS signature")?;

        Ok(Self {
            header,
            header_segment: header_segment.to_string(),
            payload,
            payload_segment: payload_segment.to_string(),
            key: None,
            signature: Some(signature),
        })
    }

    /// Serialize to compact form. Fails if there is no signature.
    pub fn to_compact(&self) -> Result<String, CryptoError> {
        let signature = self.signature.as_ref().ok_or(CryptoError::MissingSignature)?;
        Ok(format!(
            "{}.{}",
            self.signing_input(),
            b64url_encode(signature)
        ))
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The `kid` header parameter, if present.
    pub fn kid(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// Replace the header and re-sign.
    pub fn set_header(&mut self, header: Map<String, Value>) -> Result<(), CryptoError> {
        self.header = header;
        if let Some(key) = &self.key {
            self.header
                .insert("kid".to_string(), Value::String(key.kid().to_string()));
        }
        self.header_segment = encode_header(&self.header)?;
        self.resign()
    }

    /// Replace the payload and re-sign.
    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) -> Result<(), CryptoError> {
        self.payload = payload.into();
        self.payload_segment = b64url_encode(&self.payload);
        self.resign()
    }

    /// Attach a private signing key, set the header `kid`, and re-sign.
    pub fn set_key(&mut self, key: Key) -> Result<(), CryptoError> {
        if !key.is_private() {
            return Err(CryptoError::InvalidKey(format!(
                "key {} is public and cannot sign a JWS",
                key.kid()
            )));
        }
        self.header
            .insert("kid".to_string(), Value::String(key.kid().to_string()));
        self.header_segment = encode_header(&self.header)?;
        self.key = Some(key);
        self.resign()
    }

    /// The bytes the signature covers: `header_segment "." payload_segment`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header_segment, self.payload_segment)
    }

    /// Check the signature against `key`. Returns `Ok(false)` on mismatch.
    pub fn verify_with(&self, key: &Key) -> Result<bool, CryptoError> {
        let signature = self.signature.as_ref().ok_or(CryptoError::MissingSignature)?;
        Ok(key.verify(self.signing_input().as_bytes(), signature))
    }

    /// Check the signature against the envelope's own key.
    pub fn verify(&self) -> Result<bool, CryptoError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKey("JWS has no key to verify with".to_string()))?;
        self.verify_with(key)
    }

    fn resign(&mut self) -> Result<(), CryptoError> {
        self.signature = match &self.key {
            Some(key) => Some(key.sign(self.signing_input().as_bytes())?),
            None => None,
        };
        Ok(())
    }
}

fn encode_header(header: &Map<String, Value>) -> Result<String, CryptoError> {
    Ok(b64url_encode(serde_json::to_vec(header)?))
}

fn decode(segment: &str, context: &'static str) -> Result<Vec<u8>, CryptoError> {
    b64url_decode(segment).map_err(|source| CryptoError::Base64 { context, source })
}
