//! License Entity
//!
//! A durable record binding a customer and machine to an expiry and feature
//! set. Validity is never cached on the record: it is computed from the
//! stored attributes at read time.

use chrono::{DateTime, Utc};
use kernel::id::LicenseId;
use serde_json::{Map, Value};

use crate::domain::value_object::license_key::LicenseKey;

/// License entity
#[derive(Debug, Clone)]
pub struct License {
    /// Opaque record id
    pub id: LicenseId,
    /// Client-presented key, unique across all records
    pub license_key: LicenseKey,
    /// Customer the license was issued to
    pub customer: String,
    /// Machine the license is bound to; immutable after issuance
    pub machine_id: String,
    /// Open feature mapping, opaque to the engine
    pub features: Map<String, Value>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Monotonic: once true, never reverts
    pub revoked: bool,
    /// Last heartbeat, if any
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp, refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}

/// Outcome of computing a license's validity
///
/// Ordered by reporting priority: an identity mismatch is reported before
/// any state check, so a caller presenting the wrong machine never learns
/// whether the license is otherwise revoked or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseValidity {
    Valid,
    MachineMismatch,
    Revoked,
    Expired,
}

impl LicenseValidity {
    /// Reason string reported to clients, or None when valid
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            LicenseValidity::Valid => None,
            LicenseValidity::MachineMismatch => Some("machine mismatch"),
            LicenseValidity::Revoked => Some("revoked"),
            LicenseValidity::Expired => Some("expired"),
        }
    }
}

impl License {
    /// Create a new license with a freshly generated key
    pub fn issue(
        customer: String,
        machine_id: String,
        expires_at: DateTime<Utc>,
        features: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LicenseId::new(),
            license_key: LicenseKey::generate(),
            customer,
            machine_id,
            features,
            expires_at,
            revoked: false,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compute validity for a presented machine at `now`
    pub fn validity(&self, machine_id: &str, now: DateTime<Utc>) -> LicenseValidity {
        if self.machine_id != machine_id {
            LicenseValidity::MachineMismatch
        } else if self.revoked {
            LicenseValidity::Revoked
        } else if now > self.expires_at {
            LicenseValidity::Expired
        } else {
            LicenseValidity::Valid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(expires_in: Duration) -> License {
        License::issue(
            "acme".to_string(),
            "m1".to_string(),
            Utc::now() + expires_in,
            Map::new(),
        )
    }

    #[test]
    fn test_issue_defaults() {
        let license = sample(Duration::days(30));
        assert!(!license.revoked);
        assert!(license.last_seen_at.is_none());
        assert_eq!(license.created_at, license.updated_at);
    }

    #[test]
    fn test_validity_happy_path() {
        let license = sample(Duration::days(30));
        assert_eq!(license.validity("m1", Utc::now()), LicenseValidity::Valid);
    }

    #[test]
    fn test_validity_machine_mismatch() {
        let license = sample(Duration::days(30));
        assert_eq!(
            license.validity("m2", Utc::now()),
            LicenseValidity::MachineMismatch
        );
    }

    #[test]
    fn test_validity_revoked() {
        let mut license = sample(Duration::days(30));
        license.revoked = true;
        assert_eq!(license.validity("m1", Utc::now()), LicenseValidity::Revoked);
    }

    #[test]
    fn test_validity_expired() {
        let license = sample(Duration::days(-1));
        assert_eq!(license.validity("m1", Utc::now()), LicenseValidity::Expired);
    }

    #[test]
    fn test_machine_mismatch_wins_over_state() {
        // wrong machine AND revoked AND expired: mismatch is reported
        let mut license = sample(Duration::days(-1));
        license.revoked = true;
        assert_eq!(
            license.validity("m2", Utc::now()),
            LicenseValidity::MachineMismatch
        );
    }

    #[test]
    fn test_revoked_wins_over_expired() {
        let mut license = sample(Duration::days(-1));
        license.revoked = true;
        assert_eq!(license.validity("m1", Utc::now()), LicenseValidity::Revoked);
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(LicenseValidity::Valid.reason(), None);
        assert_eq!(
            LicenseValidity::MachineMismatch.reason(),
            Some("machine mismatch")
        );
        assert_eq!(LicenseValidity::Revoked.reason(), Some("revoked"));
        assert_eq!(LicenseValidity::Expired.reason(), Some("expired"));
    }
}
