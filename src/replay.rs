//! Timestamp freshness check for signed requests.
//!
//! Bounds how long a captured request stays replayable. Single use within the
//! window is not enforced here; the activation dedup cache and the store's
//! conditional update cover that.

use chrono::{DateTime, Duration, Utc};

/// Default acceptance window on either side of server time.
pub const DEFAULT_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy)]
pub struct ReplayGuard {
    window: Duration,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}

impl ReplayGuard {
    pub fn new(window_secs: i64) -> Self {
        Self {
            window: Duration::seconds(window_secs),
        }
    }

    /// Whether `timestamp` (RFC 3339) falls within the window around now.
    pub fn is_fresh(&self, timestamp: &str) -> bool {
        self.is_fresh_at(timestamp, Utc::now())
    }

    /// Same as [`ReplayGuard::is_fresh`] with an explicit clock.
    ///
    /// The window is open: a timestamp exactly `window` away is rejected.
    pub fn is_fresh_at(&self, timestamp: &str, now: DateTime<Utc>) -> bool {
        let Ok(client_time) = DateTime::parse_from_rfc3339(timestamp.trim()) else {
            tracing::debug!(timestamp, "Rejecting malformed request timestamp");
            return false;
        };
        let client_time = client_time.with_timezone(&Utc);

        client_time > now - self.window && client_time < now + self.window
    }
}
