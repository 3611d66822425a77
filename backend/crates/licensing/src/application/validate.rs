//! Validate Use Case
//!
//! Computes a license's validity for a presented machine. Validation
//! failures are data, not errors: the output always distinguishes
//! "unknown", "mismatch", "revoked", and "expired" so clients can branch
//! on the reason without error handling.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entity::license::LicenseValidity;
use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

/// Validate input
pub struct ValidateInput {
    pub license_key: String,
    pub machine_id: String,
}

/// Validate output
pub struct ValidateOutput {
    pub valid: bool,
    pub revoked: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<&'static str>,
}

/// Validate use case
pub struct ValidateUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
}

impl<R> ValidateUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: ValidateInput) -> LicenseResult<ValidateOutput> {
        let key = LicenseKey::parse(&input.license_key)
            .ok_or(LicenseError::MissingField("license_key"))?;
        if input.machine_id.trim().is_empty() {
            return Err(LicenseError::MissingField("machine_id"));
        }

        let Some(license) = self.repo.find_by_key(&key).await? else {
            return Ok(ValidateOutput {
                valid: false,
                revoked: false,
                expires_at: None,
                reason: Some("unknown license"),
            });
        };

        let validity = license.validity(&input.machine_id, Utc::now());

        Ok(ValidateOutput {
            valid: validity == LicenseValidity::Valid,
            revoked: validity == LicenseValidity::Revoked,
            // a mismatched machine learns nothing beyond the mismatch
            expires_at: match validity {
                LicenseValidity::MachineMismatch => None,
                _ => Some(license.expires_at),
            },
            reason: validity.reason(),
        })
    }
}
