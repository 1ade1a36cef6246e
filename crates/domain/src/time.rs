//! Timestamps for write dates and component bookkeeping.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

pub type Timestamp = DateTime<Utc>;

#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whether `earlier` happened less than `window` before `later`.
#[must_use]
pub fn within(earlier: Timestamp, later: Timestamp, window: Duration) -> bool {
    later - earlier < window
}

/// Second-precision RFC 3339 text stored in `updated_at` columns,
/// e.g. `2024-05-01T12:00:00Z`.
#[must_use]
pub fn to_column(at: Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
