//! Application Configuration
//!
//! Configuration for the Licensing application layer. Key material is
//! parsed once here; a bad key is a construction error the composition
//! root turns into a fatal startup failure.

use platform::signing::{KeyParseError, PayloadSigner, PayloadVerifier, generate_pem_pair};

/// Licensing application configuration
#[derive(Debug, Clone)]
pub struct LicensingConfig {
    /// Single plaintext admin key; fallback when no hashes are configured
    pub admin_api_key: Option<String>,
    /// Accepted admin key hashes (Argon2 PHC strings)
    pub admin_api_key_hashes: Vec<String>,
    /// Signs issued license payloads
    signer: PayloadSigner,
    /// Verifies payload signatures (clients do this with the embedded
    /// public key; kept here so the pair is validated together)
    verifier: PayloadVerifier,
    /// Public key PEM embedded in issued license files
    public_key_pem: String,
}

impl LicensingConfig {
    /// Build a config, parsing both signing keys
    pub fn new(
        admin_api_key: Option<String>,
        admin_api_key_hashes: Vec<String>,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<Self, KeyParseError> {
        let signer = PayloadSigner::from_pem(private_key_pem)?;
        let verifier = PayloadVerifier::from_pem(public_key_pem)?;
        Ok(Self {
            admin_api_key,
            admin_api_key_hashes,
            signer,
            verifier,
            public_key_pem: public_key_pem.to_string(),
        })
    }

    /// Config with a freshly generated key pair (for development and tests)
    pub fn development(admin_api_key: impl Into<String>) -> Self {
        let (private_pem, public_pem) = generate_pem_pair();
        Self::new(
            Some(admin_api_key.into()),
            Vec::new(),
            &private_pem,
            &public_pem,
        )
        .expect("generated key pair parses")
    }

    pub fn signer(&self) -> &PayloadSigner {
        &self.signer
    }

    pub fn verifier(&self) -> &PayloadVerifier {
        &self.verifier
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Split a configured hash list on commas, semicolons, and newlines
    pub fn split_hash_list(raw: &str) -> Vec<String> {
        raw.split(|c| matches!(c, ',' | ';' | '\n' | '\r'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_keys() {
        let (private_pem, public_pem) = generate_pem_pair();

        assert!(LicensingConfig::new(None, Vec::new(), "garbage", &public_pem).is_err());
        assert!(LicensingConfig::new(None, Vec::new(), &private_pem, "garbage").is_err());
        assert!(LicensingConfig::new(None, Vec::new(), &private_pem, &public_pem).is_ok());
    }

    #[test]
    fn test_split_hash_list() {
        let raw = "$argon2$a, $argon2$b;$argon2$c\n$argon2$d\r\n ,, ";
        assert_eq!(
            LicensingConfig::split_hash_list(raw),
            vec!["$argon2$a", "$argon2$b", "$argon2$c", "$argon2$d"]
        );
    }

    #[test]
    fn test_split_hash_list_empty() {
        assert!(LicensingConfig::split_hash_list("").is_empty());
        assert!(LicensingConfig::split_hash_list(" ,; ").is_empty());
    }
}
