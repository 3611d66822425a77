//! Update Use Case
//!
//! Partial update of a license's terms: only the supplied fields change.
//! Machine binding and revocation state are never touched here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

/// Update input
pub struct UpdateInput {
    pub license_key: String,
    /// New expiry as an RFC 3339 string, if supplied
    pub expires_at: Option<String>,
    /// Replacement feature mapping, if supplied
    pub features: Option<Map<String, Value>>,
}

/// Update use case
pub struct UpdateUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
}

impl<R> UpdateUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: UpdateInput) -> LicenseResult<()> {
        let key = LicenseKey::parse(&input.license_key)
            .ok_or(LicenseError::MissingField("license_key"))?;

        if input.expires_at.is_none() && input.features.is_none() {
            return Err(LicenseError::NoUpdateFields);
        }

        let expires_at = input
            .expires_at
            .as_deref()
            .map(parse_expiry)
            .transpose()?;

        let affected = self
            .repo
            .update_terms(&key, expires_at, input.features.as_ref())
            .await?;
        if affected == 0 {
            return Err(LicenseError::LicenseNotFound);
        }

        tracing::info!(
            license_key = %key,
            expiry_changed = expires_at.is_some(),
            features_changed = input.features.is_some(),
            "License updated"
        );
        Ok(())
    }
}

fn parse_expiry(raw: &str) -> LicenseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LicenseError::InvalidExpiry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_accepts_rfc3339() {
        assert!(parse_expiry("2030-01-01T00:00:00Z").is_ok());
        assert!(parse_expiry("2030-01-01T00:00:00.123456789Z").is_ok());
        assert!(parse_expiry("2030-01-01T09:30:00+02:00").is_ok());
    }

    #[test]
    fn test_parse_expiry_rejects_garbage() {
        assert!(matches!(
            parse_expiry("next tuesday"),
            Err(LicenseError::InvalidExpiry)
        ));
        assert!(matches!(
            parse_expiry("2030-01-01"),
            Err(LicenseError::InvalidExpiry)
        ));
    }
}
