//! API DTOs (Data Transfer Objects)
//!
//! Wire format is snake_case JSON, matching the license files consumed by
//! deployed clients. Timestamps leaving the system are normalized to one
//! format: RFC 3339 with nanosecond precision and a UTC `Z` suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::issue::LicenseArtifact;
use crate::application::validate::ValidateOutput;
use crate::domain::entity::license::License;

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ============================================================================
// Issue
// ============================================================================

/// Issue request
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub machine_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub features: Map<String, Value>,
}

/// Signed license file handed back to the administrator
#[derive(Debug, Clone, Serialize)]
pub struct LicenseFileResponse {
    pub customer: String,
    pub machine_id: String,
    pub license_key: String,
    pub expires_at: String,
    pub features: Map<String, Value>,
    pub issued_at: String,
    pub signature: String,
    pub public_key_pem: String,
}

impl From<LicenseArtifact> for LicenseFileResponse {
    fn from(artifact: LicenseArtifact) -> Self {
        Self {
            customer: artifact.license.customer,
            machine_id: artifact.license.machine_id,
            license_key: artifact.license.license_key.as_str().to_string(),
            expires_at: format_timestamp(artifact.license.expires_at),
            features: artifact.license.features,
            issued_at: format_timestamp(artifact.issued_at),
            signature: artifact.signature,
            public_key_pem: artifact.public_key_pem,
        }
    }
}

// ============================================================================
// Validate
// ============================================================================

/// Validate request
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub machine_id: String,
}

/// Validate response
///
/// Always returned with status 200: validation failures are data.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<ValidateOutput> for ValidateResponse {
    fn from(output: ValidateOutput) -> Self {
        Self {
            valid: output.valid,
            revoked: output.revoked,
            expires_at: output.expires_at.map(format_timestamp),
            reason: output.reason.map(str::to_string),
        }
    }
}

// ============================================================================
// Revoke / Heartbeat / Update
// ============================================================================

/// Request carrying only a license key
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseKeyRequest {
    #[serde(default)]
    pub license_key: String,
}

/// Partial-update request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLicenseRequest {
    #[serde(default)]
    pub license_key: String,
    pub expires_at: Option<String>,
    pub features: Option<Map<String, Value>>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// ============================================================================
// List
// ============================================================================

/// One license in the admin listing
#[derive(Debug, Clone, Serialize)]
pub struct LicenseSummary {
    pub id: String,
    pub license_key: String,
    pub customer: String,
    pub machine_id: String,
    pub expires_at: String,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub features: Map<String, Value>,
}

impl From<License> for LicenseSummary {
    fn from(license: License) -> Self {
        Self {
            id: license.id.to_string(),
            license_key: license.license_key.as_str().to_string(),
            customer: license.customer,
            machine_id: license.machine_id,
            expires_at: format_timestamp(license.expires_at),
            revoked: license.revoked,
            last_seen_at: license.last_seen_at.map(format_timestamp),
            features: license.features,
        }
    }
}

/// List response
#[derive(Debug, Clone, Serialize)]
pub struct ListLicensesResponse {
    pub licenses: Vec<LicenseSummary>,
}
