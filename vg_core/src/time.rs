// ABOUTME: Wall-clock sources and timestamp helpers for the detection pipeline.
// ABOUTME: Provides an injectable Clock, a manual clock for tests, and monotonic timers.
use chrono::{DateTime, Local, SecondsFormat};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of wall-clock time
///
/// Everything that stamps events takes time from a `Clock` so sessions can be
/// replayed deterministically.
pub trait Clock: Send + Sync {
    /// Current local time
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock
///
/// With a step configured, every call to [`Clock::now`] returns the current
/// instant and then moves the clock forward by that step.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Local, TimeZone};
/// use vg_core::{Clock, ManualClock};
///
/// let start = Local.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
/// let clock = ManualClock::with_step(start, Duration::seconds(1));
/// assert_eq!(clock.now(), start);
/// assert_eq!(clock.now(), start + Duration::seconds(1));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Local>>,
    step: chrono::Duration,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Local>) -> Self {
        Self::with_step(start, chrono::Duration::zero())
    }

    /// Create a clock that advances by `step` after every reading
    pub fn with_step(start: DateTime<Local>, step: chrono::Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: DateTime<Local>) {
        *self.lock() = time;
    }

    /// Move the clock forward
    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.lock();
        *current += by;
    }

    /// Read the current time without stepping
    pub fn peek(&self) -> DateTime<Local> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Local>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let mut current = self.lock();
        let now = *current;
        *current += self.step;
        now
    }
}

/// Seconds elapsed from `start` to `end` with microsecond resolution
///
/// Negative when `end` precedes `start`.
pub fn seconds_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// Format a timestamp the way overlays and reports display it
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use vg_core::format_timestamp;
///
/// let t = Local.with_ymd_and_hms(2021, 1, 1, 9, 5, 3).unwrap();
/// assert_eq!(format_timestamp(t), "2021-01-01 09:05:03");
/// ```
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Convert a timestamp to RFC3339 with microsecond precision
pub fn to_rfc3339(time: DateTime<Local>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Create a monotonic duration measurer
///
/// # Examples
///
/// ```
/// use vg_core::MonotonicTimer;
/// use std::thread;
/// use std::time::Duration;
///
/// let timer = MonotonicTimer::new();
/// thread::sleep(Duration::from_millis(1));
/// assert!(timer.elapsed() >= Duration::from_millis(1));
/// ```
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Reset the timer to now
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}
