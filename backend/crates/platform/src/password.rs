//! API Key Hash Verification
//!
//! Admin credentials are machine-generated API keys stored as Argon2id
//! hashes in PHC string format. Unlike human passwords there is no policy
//! surface here: keys are high-entropy, so the only operations are hashing
//! a key for storage and verifying a presented key against a stored hash.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;

/// API key hashing/verification errors
#[derive(Debug, Error)]
pub enum ApiKeyHashError {
    /// Hashing operation failed
    #[error("API key hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hash format
    #[error("Invalid API key hash format")]
    InvalidHashFormat,
}

/// Hashed API key in PHC string format
///
/// Construction validates the PHC string, so a held value is always
/// well-formed; callers iterating a configured hash list can skip entries
/// that fail to parse.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyHash {
    hash: String,
}

impl ApiKeyHash {
    /// Create from PHC string (e.g., from configuration)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, ApiKeyHashError> {
        let hash = s.into();

        // Validate it's a valid PHC string
        PasswordHash::new(&hash).map_err(|_| ApiKeyHashError::InvalidHashFormat)?;

        Ok(Self { hash })
    }

    /// Hash a plaintext API key with Argon2id
    pub fn generate(key: &str) -> Result<Self, ApiKeyHashError> {
        let salt = SaltString::generate(OsRng);
        let hash = Argon2::default()
            .hash_password(key.as_bytes(), &salt)
            .map_err(|e| ApiKeyHashError::HashingFailed(e.to_string()))?;

        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a presented API key against this hash
    ///
    /// Argon2 uses constant-time comparison internally.
    pub fn verify(&self, presented: &str) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(presented.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl fmt::Debug for ApiKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHash")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify() {
        let hash = ApiKeyHash::generate("test-admin-key").unwrap();

        assert!(hash.verify("test-admin-key"));
        assert!(!hash.verify("wrong-key"));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let hash = ApiKeyHash::generate("test-admin-key").unwrap();

        let phc = hash.as_phc_string().to_string();
        let restored = ApiKeyHash::from_phc_string(phc).unwrap();

        assert!(restored.verify("test-admin-key"));
    }

    #[test]
    fn test_invalid_phc_string() {
        let result = ApiKeyHash::from_phc_string("not_a_valid_hash");
        assert!(matches!(result, Err(ApiKeyHashError::InvalidHashFormat)));
    }

    #[test]
    fn test_debug_redaction() {
        let hash = ApiKeyHash::generate("secret-key").unwrap();
        let debug_output = format!("{:?}", hash);
        assert!(debug_output.contains("[HASH]"));
        assert!(!debug_output.contains("secret-key"));
    }
}
