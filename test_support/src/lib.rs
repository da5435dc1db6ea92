//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Fixed timestamps and synthetic motion sequences for all crates

use chrono::{DateTime, Local, TimeZone};

/// Build an unambiguous local timestamp
///
/// Panics if the wall time does not exist in the local zone, which is fine
/// for fixtures.
pub fn local_time(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, min, sec)
        .earliest()
        .expect("fixture timestamp must exist in local time zone")
}

/// Monday 2024-01-15 at the given time of day
pub fn monday_at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    local_time(2024, 1, 15, hour, min, sec)
}

/// Parse a motion pattern such as `"FFTTTFF"` into per-frame booleans
pub fn motion_pattern(pattern: &str) -> Vec<bool> {
    pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| matches!(c, 'T' | 't' | '1'))
        .collect()
}
