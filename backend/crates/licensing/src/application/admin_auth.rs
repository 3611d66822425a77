//! Admin Authentication
//!
//! Verifies bearer credentials for the administrative surface and drives
//! the failure tracker. When one or more accepted hashes are configured the
//! presented key must match one of them; otherwise the single configured
//! plaintext key is compared in constant time. A missing configuration
//! always rejects.
//!
//! Rejections are surfaced uniformly as `Unauthorized` regardless of which
//! check failed.

use std::sync::Arc;

use platform::crypto::constant_time_eq;
use platform::failure::FailureTracker;
use platform::password::ApiKeyHash;

use crate::application::config::LicensingConfig;
use crate::error::{LicenseError, LicenseResult};

/// Admin credential authenticator
///
/// One shared instance per process: it owns the failure-tracking state for
/// the whole administrative surface.
pub struct AdminAuthenticator {
    config: Arc<LicensingConfig>,
    failures: FailureTracker,
}

impl AdminAuthenticator {
    pub fn new(config: Arc<LicensingConfig>) -> Self {
        Self::with_tracker(config, FailureTracker::default())
    }

    pub fn with_tracker(config: Arc<LicensingConfig>, failures: FailureTracker) -> Self {
        Self { config, failures }
    }

    /// Check a presented key without touching failure state
    ///
    /// Used both for real authentication and for limiter-key derivation,
    /// so the check runs once per request (the middleware shares the
    /// outcome through request extensions).
    pub fn key_matches(&self, presented: &str) -> bool {
        let hashes = &self.config.admin_api_key_hashes;
        if !hashes.is_empty() {
            // a malformed stored hash is skipped, not fatal
            return hashes.iter().any(|h| {
                ApiKeyHash::from_phc_string(h)
                    .map(|hash| hash.verify(presented))
                    .unwrap_or(false)
            });
        }

        match &self.config.admin_api_key {
            Some(want) => constant_time_eq(want.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }

    /// Enforce a previously computed verification outcome for `tracking_key`
    ///
    /// Success resets the tracked state; rejection records a failure and
    /// emits the one-shot alert event when the threshold is crossed.
    pub fn finish(&self, credential_ok: bool, tracking_key: &str) -> LicenseResult<()> {
        if credential_ok {
            self.failures.reset(tracking_key);
            return Ok(());
        }

        let (count, alert) = self.failures.record_failure(tracking_key);
        if alert {
            tracing::warn!(
                key = %tracking_key,
                count,
                window_secs = self.failures.window().as_secs(),
                "Admin authentication failure threshold crossed"
            );
        }
        Err(LicenseError::Unauthorized)
    }

    /// Authenticate a bearer credential, driving the failure tracker
    ///
    /// Returns the accepted credential for downstream limiter-key
    /// derivation.
    pub fn authenticate(&self, bearer: Option<&str>, tracking_key: &str) -> LicenseResult<String> {
        match bearer.filter(|token| self.key_matches(token)) {
            Some(token) => {
                self.finish(true, tracking_key)?;
                Ok(token.to_string())
            }
            None => {
                self.finish(false, tracking_key)?;
                Err(LicenseError::Unauthorized)
            }
        }
    }
}
