//! Time bucketing utilities
//!
//! Pure calendar-day helpers shared by the store's day-splitting logic and
//! the analytics facades. All bucketing is done on UTC calendar days so the
//! same instant always lands in the same bucket regardless of the host
//! timezone.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::types::TimeRange;

/// Render format for day keys.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Day key (`YYYY-MM-DD`) for the UTC calendar day containing `ts`.
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format(DAY_KEY_FORMAT).to_string()
}

/// Parse a day key back into the start of that UTC day.
///
/// Returns `None` for malformed keys; queries over persisted data skip
/// those rather than aborting.
pub fn parse_day_key(key: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Midnight (UTC) of the day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    // and_hms_opt(0, 0, 0) cannot fail for a valid date
    ts.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Midnight (UTC) of the day after the one containing `ts`.
pub fn next_day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(ts) + Duration::days(1)
}

/// Day keys for the `n` calendar days ending today, oldest first.
pub fn last_n_day_keys(now: DateTime<Utc>, n: usize) -> Vec<String> {
    (0..n as i64)
        .rev()
        .map(|offset| day_key(now - Duration::days(offset)))
        .collect()
}

/// Inclusive lower bound of a reporting window.
///
/// `Today` starts at midnight today, `7d` at midnight 6 days ago, `30d` at
/// midnight 29 days ago, `All` at the epoch.
pub fn range_start(range: TimeRange, now: DateTime<Utc>) -> DateTime<Utc> {
    match range {
        TimeRange::Today => start_of_day(now),
        TimeRange::Last7Days => start_of_day(now - Duration::days(6)),
        TimeRange::Last30Days => start_of_day(now - Duration::days(29)),
        TimeRange::All => DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Number of whole days a range spans, or `None` for `All`.
pub fn range_days(range: TimeRange) -> Option<i64> {
    match range {
        TimeRange::Today => Some(1),
        TimeRange::Last7Days => Some(7),
        TimeRange::Last30Days => Some(30),
        TimeRange::All => None,
    }
}
