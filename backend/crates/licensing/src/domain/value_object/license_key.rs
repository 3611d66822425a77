use std::fmt;

use uuid::Uuid;

/// Client-presented license key
///
/// The unique reference a deployed client presents to validate or heartbeat
/// its license. Distinct from the opaque record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Generate a fresh key (UUID v4 string)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a client-presented key
    ///
    /// Returns `None` for empty or whitespace-only input; the caller decides
    /// how to surface the missing field.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
