//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Deadline a whole number of hours past `from`
///
/// Saturates at the chrono range limit rather than panicking on
/// absurd window values.
pub fn hours_after(from: DateTime<Utc>, hours: u64) -> DateTime<Utc> {
    let hours = i64::try_from(hours).unwrap_or(i64::MAX);
    let window = Duration::try_hours(hours).unwrap_or(Duration::MAX);
    from.checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
