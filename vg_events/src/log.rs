//! ABOUTME: Thread-safe handle to the event state machine shared by worker and readers
//! ABOUTME: Every read returns a copy so callers never see or mutate shared state

use crate::{export, DetectionStats, EventStateMachine, MotionEvent, MotionState, Transition};
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use vg_core::Result;

/// Shared event log
///
/// Cloning the handle shares the same underlying log. The detection worker
/// writes through it while reporting paths read snapshots concurrently.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<EventStateMachine>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log that keeps at most `max_events` closed events
    pub fn with_retention(max_events: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventStateMachine::with_retention(max_events))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EventStateMachine> {
        // A panicked writer leaves the log consistent between calls
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn observe(&self, motion: bool, now: DateTime<Local>) -> Option<Transition> {
        self.lock().observe(motion, now)
    }

    pub fn close_open_event(&self, now: DateTime<Local>) -> Option<MotionEvent> {
        self.lock().close_open_event(now)
    }

    pub fn state(&self) -> MotionState {
        self.lock().state()
    }

    pub fn events(&self) -> Vec<MotionEvent> {
        self.lock().events()
    }

    pub fn recent(&self, n: usize) -> Vec<MotionEvent> {
        self.lock().recent(n)
    }

    pub fn len(&self) -> usize {
        self.lock().event_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> DetectionStats {
        self.lock().stats()
    }

    /// Events and statistics read under one lock, so the pair is consistent
    pub fn snapshot(&self) -> (Vec<MotionEvent>, DetectionStats) {
        let machine = self.lock();
        (machine.events(), machine.stats())
    }

    pub fn set_fps(&self, fps: f64) {
        self.lock().set_fps(fps);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Write the closed events as CSV; returns false when there was nothing to write
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<bool> {
        let events = self.events();
        export::export_to_path(&events, path)
    }
}
