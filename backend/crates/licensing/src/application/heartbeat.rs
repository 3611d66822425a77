//! Heartbeat Use Case

use std::sync::Arc;

use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

/// Heartbeat use case
///
/// Records that a deployed client was seen. Touches only `last_seen_at`
/// and `updated_at`; a revoked license stays revoked.
pub struct HeartbeatUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
}

impl<R> HeartbeatUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, license_key: &str) -> LicenseResult<()> {
        let key =
            LicenseKey::parse(license_key).ok_or(LicenseError::MissingField("license_key"))?;

        let affected = self.repo.record_heartbeat(&key).await?;
        if affected == 0 {
            return Err(LicenseError::LicenseNotFound);
        }

        tracing::debug!(license_key = %key, "Heartbeat recorded");
        Ok(())
    }
}
