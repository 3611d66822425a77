//! Authentication Failure Tracking
//!
//! Sliding-window failure counters keyed by caller identity. Each key gets a
//! one-shot alert latch per campaign: the alert fires exactly once when the
//! count first reaches the threshold inside the window, and arms again only
//! after the state resets.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rolling window over which failures accumulate
pub const FAILURE_WINDOW: Duration = Duration::from_secs(600);

/// Failure count at which the alert fires
pub const FAILURE_THRESHOLD: u32 = 5;

#[derive(Debug)]
struct FailureState {
    count: u32,
    last_failure: Instant,
    alerted: bool,
}

/// Per-key failure counter with a one-shot alert latch
///
/// Owns its key→state map behind a single lock; no I/O happens while the
/// lock is held.
#[derive(Debug)]
pub struct FailureTracker {
    window: Duration,
    threshold: u32,
    state: Mutex<HashMap<String, FailureState>>,
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(FAILURE_WINDOW, FAILURE_THRESHOLD)
    }
}

impl FailureTracker {
    pub fn new(window: Duration, threshold: u32) -> Self {
        Self {
            window,
            threshold,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// The configured sliding window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The configured alert threshold
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record a failed attempt for `key`
    ///
    /// Returns the updated count and whether this attempt crossed the alert
    /// threshold for the current window. A state older than the window is
    /// replaced by a fresh one before counting.
    pub fn record_failure(&self, key: &str) -> (u32, bool) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let entry = state
            .entry(key.to_string())
            .and_modify(|st| {
                if now.duration_since(st.last_failure) > self.window {
                    st.count = 0;
                    st.alerted = false;
                }
            })
            .or_insert(FailureState {
                count: 0,
                last_failure: now,
                alerted: false,
            });

        entry.count += 1;
        entry.last_failure = now;

        if entry.count >= self.threshold && !entry.alerted {
            entry.alerted = true;
            (entry.count, true)
        } else {
            (entry.count, false)
        }
    }

    /// Forget all state for `key` (called on successful authentication)
    pub fn reset(&self, key: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_fires_exactly_on_threshold() {
        let tracker = FailureTracker::new(FAILURE_WINDOW, 5);

        for expected in 1..=4u32 {
            let (count, alert) = tracker.record_failure("203.0.113.9");
            assert_eq!(count, expected);
            assert!(!alert);
        }

        let (count, alert) = tracker.record_failure("203.0.113.9");
        assert_eq!(count, 5);
        assert!(alert);
    }

    #[test]
    fn test_alert_does_not_repeat() {
        let tracker = FailureTracker::new(FAILURE_WINDOW, 5);
        for _ in 0..5 {
            tracker.record_failure("k");
        }

        let (count, alert) = tracker.record_failure("k");
        assert_eq!(count, 6);
        assert!(!alert);
    }

    #[test]
    fn test_reset_rearms_the_alert() {
        let tracker = FailureTracker::new(FAILURE_WINDOW, 5);
        for _ in 0..5 {
            tracker.record_failure("k");
        }
        tracker.reset("k");

        for expected in 1..=4u32 {
            let (count, alert) = tracker.record_failure("k");
            assert_eq!(count, expected);
            assert!(!alert);
        }
        let (_, alert) = tracker.record_failure("k");
        assert!(alert);
    }

    #[test]
    fn test_window_expiry_starts_fresh() {
        let tracker = FailureTracker::new(Duration::from_millis(20), 5);
        for _ in 0..5 {
            tracker.record_failure("k");
        }

        std::thread::sleep(Duration::from_millis(40));

        let (count, alert) = tracker.record_failure("k");
        assert_eq!(count, 1);
        assert!(!alert);
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = FailureTracker::new(FAILURE_WINDOW, 5);
        for _ in 0..4 {
            tracker.record_failure("a");
        }

        let (count, alert) = tracker.record_failure("b");
        assert_eq!(count, 1);
        assert!(!alert);

        let (count, alert) = tracker.record_failure("a");
        assert_eq!(count, 5);
        assert!(alert);
    }
}
