//! Revoke Use Case

use std::sync::Arc;

use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

/// Revoke use case
///
/// Revocation is monotonic and matches on the key alone, so revoking an
/// already-revoked license succeeds with no further state change.
pub struct RevokeUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
}

impl<R> RevokeUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, license_key: &str) -> LicenseResult<()> {
        let key =
            LicenseKey::parse(license_key).ok_or(LicenseError::MissingField("license_key"))?;

        let affected = self.repo.mark_revoked(&key).await?;
        if affected == 0 {
            return Err(LicenseError::LicenseNotFound);
        }

        tracing::info!(license_key = %key, "License revoked");
        Ok(())
    }
}
