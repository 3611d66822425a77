//! Canonical JSON Signing
//!
//! Deterministic serialization of JSON payloads and ECDSA P-256/SHA-256
//! signatures over them. The same canonical byte string is computed at
//! signing and verification time, so a payload signs identically regardless
//! of how its map was constructed.
//!
//! Signatures are DER-encoded and transported as URL-safe base64 with the
//! padding stripped. Verification is fail-closed: any malformed token or
//! mismatched payload reports `false`, never an error.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use p256::{PublicKey, SecretKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Key material parse errors
///
/// These are configuration errors: keys are parsed once at startup and a
/// failure here must abort the process, never surface at request time.
#[derive(Debug, Error)]
pub enum KeyParseError {
    /// Private key PEM could not be parsed as SEC1 or PKCS#8 P-256
    #[error("invalid signing private key: {0}")]
    InvalidPrivateKey(String),

    /// Public key PEM could not be parsed as SPKI P-256
    #[error("invalid signing public key: {0}")]
    InvalidPublicKey(String),
}

// ============================================================================
// Canonical serialization
// ============================================================================

/// Serialize a JSON value to its canonical byte string
///
/// Object keys are sorted lexicographically at every nesting level and no
/// insignificant whitespace is emitted.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                // Writing into a Vec cannot fail
                serde_json::to_writer(&mut *out, key).expect("string JSON serialization");
                out.push(b':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => {
            serde_json::to_writer(&mut *out, scalar).expect("scalar JSON serialization");
        }
    }
}

// ============================================================================
// Signer / Verifier
// ============================================================================

/// Signs canonical payloads with an ECDSA P-256 private key
#[derive(Clone)]
pub struct PayloadSigner {
    key: SigningKey,
}

impl PayloadSigner {
    /// Parse a P-256 private key from PEM text
    ///
    /// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings.
    pub fn from_pem(pem: &str) -> Result<Self, KeyParseError> {
        let secret = match SecretKey::from_sec1_pem(pem) {
            Ok(secret) => secret,
            Err(_) => SecretKey::from_pkcs8_pem(pem)
                .map_err(|e| KeyParseError::InvalidPrivateKey(e.to_string()))?,
        };
        Ok(Self {
            key: SigningKey::from(secret),
        })
    }

    /// Sign the canonical form of `payload`
    ///
    /// Returns the DER signature as URL-safe base64 without padding.
    pub fn sign(&self, payload: &Value) -> String {
        let digest = Sha256::new_with_prefix(canonical_json(payload));
        let signature: Signature = self.key.sign_digest(digest);
        URL_SAFE_NO_PAD.encode(signature.to_der())
    }
}

impl std::fmt::Debug for PayloadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Verifies canonical payload signatures with an ECDSA P-256 public key
#[derive(Debug, Clone)]
pub struct PayloadVerifier {
    key: VerifyingKey,
}

impl PayloadVerifier {
    /// Parse a P-256 public key from SPKI PEM text (`PUBLIC KEY`)
    pub fn from_pem(pem: &str) -> Result<Self, KeyParseError> {
        let public = PublicKey::from_public_key_pem(pem)
            .map_err(|e| KeyParseError::InvalidPublicKey(e.to_string()))?;
        Ok(Self {
            key: VerifyingKey::from(public),
        })
    }

    /// Verify `signature_b64` over the canonical form of `payload`
    ///
    /// Fail-closed: malformed base64, malformed DER, or a digest mismatch
    /// all report `false`.
    pub fn verify(&self, payload: &Value, signature_b64: &str) -> bool {
        let Ok(der) = URL_SAFE_NO_PAD.decode(signature_b64.trim_end_matches('=')) else {
            return false;
        };
        let Ok(signature) = Signature::from_der(&der) else {
            return false;
        };
        let digest = Sha256::new_with_prefix(canonical_json(payload));
        self.key.verify_digest(digest, &signature).is_ok()
    }
}

/// Generate a fresh P-256 key pair as (private SEC1 PEM, public SPKI PEM)
///
/// Intended for development setups and tests.
pub fn generate_pem_pair() -> (String, String) {
    let secret = SecretKey::random(&mut rand::rngs::OsRng);
    let private_pem = secret
        .to_sec1_pem(LineEnding::LF)
        .expect("SEC1 encoding of a fresh key")
        .to_string();
    let public_pem = secret
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("SPKI encoding of a fresh key");
    (private_pem, public_pem)
}
