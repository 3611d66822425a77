//! List Use Case

use std::sync::Arc;

use crate::domain::entity::license::License;
use crate::domain::repository::LicenseRepository;
use crate::error::LicenseResult;

/// List use case
///
/// Returns every license, most recently created first. Timestamp
/// normalization to the wire format happens in the presentation layer.
pub struct ListUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
}

impl<R> ListUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> LicenseResult<Vec<License>> {
        self.repo.list().await
    }
}
