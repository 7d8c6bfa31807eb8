//! Calendar bucketing helpers
//!
//! All buckets are derived in a fixed UTC offset so that "day", "hour" and
//! "week" mean the learner's local calendar rather than UTC.

use crate::types::WeekBucket;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};

pub const HOURS_PER_DAY: usize = 24;
pub const DAYS_PER_WEEK: usize = 7;

/// Timestamp shifted into the local calendar
pub fn local(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> DateTime<FixedOffset> {
    timestamp.with_timezone(offset)
}

/// Local calendar day of a timestamp
pub fn day(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    local(timestamp, offset).date_naive()
}

/// Local hour of day (0-23)
pub fn hour(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> usize {
    local(timestamp, offset).hour() as usize
}

/// Local weekday index, Monday = 0
pub fn weekday(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// ISO week bucket of a calendar day
pub fn week_bucket(date: NaiveDate) -> WeekBucket {
    let iso = date.iso_week();
    WeekBucket::new(iso.year(), iso.week())
}

/// Monday opening an ISO week
pub fn week_start(week: WeekBucket) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(week.year, week.week, Weekday::Mon)
}

/// Zero-based index of `week` counted from `first_week` (the course start)
///
/// Returns `None` for weeks before the start or for invalid ISO weeks.
pub fn semester_week(week: WeekBucket, first_week: WeekBucket) -> Option<u32> {
    let start = week_start(first_week)?;
    let current = week_start(week)?;
    let weeks = (current - start).num_weeks();
    u32::try_from(weeks).ok()
}

/// Elapsed seconds from `from` to `to` (negative when `to` is earlier)
pub fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (*to - *from).num_milliseconds() as f64 / 1000.0
}

/// Fractional seconds as a chrono duration (millisecond precision)
///
/// `None` for non-finite values and for spans chrono cannot represent.
pub fn duration_from_secs(seconds: f64) -> Option<chrono::Duration> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    chrono::Duration::try_milliseconds(millis as i64)
}

/// Every ISO week between two days, inclusive
pub fn weeks_spanned(first: NaiveDate, last: NaiveDate) -> Vec<WeekBucket> {
    let mut weeks = Vec::new();
    let mut monday = first - chrono::Duration::days(weekday(first) as i64);
    while monday <= last {
        weeks.push(week_bucket(monday));
        monday += chrono::Duration::days(DAYS_PER_WEEK as i64);
    }
    weeks
}
