//! Converter tunables
//!
//! Centralized timing and limit constants so the session, resolver and
//! HTTP client agree on them.

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Rate provider used when settings carry no URL.
pub const DEFAULT_API_URL: &str = "https://wise.com/rates/live";

/// Application identifiers for platform config/data directories.
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "antigravity";
pub const APP_NAME: &str = "currency-lens";

/// A cached rate younger than this is served without a network call.
pub fn freshness_window() -> Duration {
    Duration::hours(24)
}

/// How far back a fallback rate written after a transport error is dated.
pub fn error_fallback_backdate() -> Duration {
    Duration::minutes(30)
}

/// Overlays close on their own after this long.
pub const AUTO_DISMISS_AFTER: StdDuration = StdDuration::from_secs(15);

/// Pause between pairs during a bulk refresh.
pub const BULK_REFRESH_DELAY: StdDuration = StdDuration::from_millis(200);

/// Upper bound on a single provider request.
pub const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Selections longer than this are truncated before pattern scanning.
pub const MAX_INPUT_LENGTH: usize = 1000;
