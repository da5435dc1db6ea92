//! ABOUTME: Motion event state machine, shared event log and statistics
//! ABOUTME: Turns per-frame motion flags into timed events, exports them and aggregates them

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub mod analytics;
pub mod export;
pub mod log;
pub mod state_machine;

pub use analytics::{DurationStats, HourlyHistogram, WeekdayHistogram};
pub use log::EventLog;
pub use state_machine::{EventStateMachine, MotionState, Transition};

/// One contiguous stretch of motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    /// `end - start` in seconds
    pub duration: f64,
}

impl MotionEvent {
    /// Build an event, never letting `end` precede `start`
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        let end = end.max(start);
        Self {
            start,
            end,
            duration: vg_core::seconds_between(start, end),
        }
    }
}

/// Running counters for a detection session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionStats {
    /// Idle to active transitions seen, including one still open
    pub total_detections: u64,
    /// Sum of durations of closed events, in seconds
    pub total_duration: f64,
    pub last_detection: Option<DateTime<Local>>,
    /// Frames processed over the last full second
    pub fps: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::local_time;

    #[test]
    fn test_event_duration() {
        let start = local_time(2024, 2, 1, 9, 0, 0);
        let end = start + chrono::Duration::milliseconds(2500);
        let event = MotionEvent::new(start, end);
        assert_eq!(event.duration, 2.5);
    }

    #[test]
    fn test_event_end_clamped_to_start() {
        let start = local_time(2024, 2, 1, 9, 0, 0);
        let event = MotionEvent::new(start, start - chrono::Duration::seconds(3));
        assert_eq!(event.end, start);
        assert_eq!(event.duration, 0.0);
    }

    #[test]
    fn test_stats_serialization() {
        let stats = DetectionStats {
            total_detections: 2,
            total_duration: 4.5,
            last_detection: Some(local_time(2024, 2, 1, 9, 0, 0)),
            fps: 29.5,
        };
        let json = serde_json::to_string(&stats).unwrap();
        let back: DetectionStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
