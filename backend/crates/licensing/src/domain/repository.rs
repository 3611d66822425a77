//! Repository Trait
//!
//! Interface for license persistence. Implementations live in the
//! infrastructure layer; the domain and application layers never branch on
//! which store backs it.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::entity::license::License;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::LicenseResult;

/// License repository trait
///
/// Mutating operations return the affected-row count; zero rows is how the
/// engine detects "no such license". Each call is a single atomic statement,
/// so no partial field updates are ever visible.
#[trait_variant::make(LicenseRepository: Send)]
pub trait LocalLicenseRepository {
    /// Persist a freshly issued license
    async fn insert(&self, license: &License) -> LicenseResult<()>;

    /// Find a license by its client-presented key
    async fn find_by_key(&self, key: &LicenseKey) -> LicenseResult<Option<License>>;

    /// Set revoked=true and bump updated_at
    ///
    /// Matches on the key alone, so revoking an already-revoked license
    /// still affects the row.
    async fn mark_revoked(&self, key: &LicenseKey) -> LicenseResult<u64>;

    /// Set last_seen_at=now and bump updated_at
    async fn record_heartbeat(&self, key: &LicenseKey) -> LicenseResult<u64>;

    /// Apply a partial update of expiry and/or features, bumping updated_at
    async fn update_terms(
        &self,
        key: &LicenseKey,
        expires_at: Option<DateTime<Utc>>,
        features: Option<&Map<String, Value>>,
    ) -> LicenseResult<u64>;

    /// All licenses, most recently created first
    async fn list(&self) -> LicenseResult<Vec<License>>;
}
