//! Human-readable incident age.

use chrono::{DateTime, Utc};

/// Text shown when the source record carried no timestamp.
pub const UNKNOWN_TIME: &str = "Unknown time";

/// Formats the age of `timestamp` relative to `now`.
///
/// Buckets: under a minute is `"Just now"` (this includes timestamps in the
/// future), then whole minutes, hours, and days, each pluralized.
#[must_use]
pub fn time_ago(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return UNKNOWN_TIME.to_string();
    };

    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "min")
    } else if hours < 24 {
        plural(hours, "hour")
    } else {
        plural(days, "day")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}
