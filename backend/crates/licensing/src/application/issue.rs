//! Issue Use Case
//!
//! Persists a new license and produces the signed license file.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::application::config::LicensingConfig;
use crate::domain::entity::license::License;
use crate::domain::repository::LicenseRepository;
use crate::error::{LicenseError, LicenseResult};

/// Issue input
pub struct IssueInput {
    pub customer: String,
    pub machine_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub features: Map<String, Value>,
}

/// Signed license file returned to the administrator
pub struct LicenseArtifact {
    pub license: License,
    pub issued_at: DateTime<Utc>,
    pub signature: String,
    pub public_key_pem: String,
}

/// Issue use case
pub struct IssueUseCase<R>
where
    R: LicenseRepository,
{
    repo: Arc<R>,
    config: Arc<LicensingConfig>,
}

impl<R> IssueUseCase<R>
where
    R: LicenseRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<LicensingConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: IssueInput) -> LicenseResult<LicenseArtifact> {
        if input.customer.trim().is_empty() {
            return Err(LicenseError::MissingField("customer"));
        }
        if input.machine_id.trim().is_empty() {
            return Err(LicenseError::MissingField("machine_id"));
        }
        let Some(expires_at) = input.expires_at else {
            return Err(LicenseError::MissingField("expires_at"));
        };

        let license = License::issue(
            input.customer,
            input.machine_id,
            expires_at,
            input.features,
        );
        self.repo.insert(&license).await?;

        let issued_at = Utc::now();
        let signature = self.config.signer().sign(&signing_payload(&license, issued_at));

        tracing::info!(
            license_key = %license.license_key,
            customer = %license.customer,
            "License issued"
        );

        Ok(LicenseArtifact {
            license,
            issued_at,
            signature,
            public_key_pem: self.config.public_key_pem().to_string(),
        })
    }
}

/// Canonical payload covered by the license file signature
///
/// Clients rebuild exactly this mapping from the license file fields when
/// verifying with the embedded public key.
pub fn signing_payload(license: &License, issued_at: DateTime<Utc>) -> Value {
    json!({
        "customer": license.customer,
        "machine_id": license.machine_id,
        "license_key": license.license_key.as_str(),
        "expires_at": license.expires_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        "issued_at": issued_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        "features": Value::Object(license.features.clone()),
    })
}
