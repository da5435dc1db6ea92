//! ABOUTME: Core types, errors, IDs, clocks and tracing utilities
//! ABOUTME: Foundation crate used by all other vigil components

pub mod error;
pub mod id;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use id::Id;
pub use time::{
    format_timestamp, seconds_between, to_rfc3339, Clock, ManualClock, MonotonicTimer,
    SystemClock,
};

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::local_time;

    #[test]
    fn test_cross_crate_usage() {
        let clock = ManualClock::new(local_time(2024, 5, 6, 14, 0, 0));
        assert_eq!(format_timestamp(clock.now()), "2024-05-06 14:00:00");
    }
}
