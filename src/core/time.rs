//! Batch timestamp helpers.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert SystemTime to nanoseconds since Unix epoch.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn system_time_to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Current wall-clock time in nanoseconds since Unix epoch.
#[inline]
pub fn now_nanos() -> u64 {
    system_time_to_nanos(SystemTime::now())
}

/// Convert nanoseconds since Unix epoch to a UTC datetime.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    let secs = (nanos / NANOS_PER_SEC) as i64;
    let subsec_nanos = (nanos % NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, subsec_nanos).unwrap_or_default()
}
