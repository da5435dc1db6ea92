//! ABOUTME: Idle/active state machine that turns motion flags into motion events
//! ABOUTME: Owns the append-only event list and the running detection statistics

use crate::{DetectionStats, MotionEvent};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Whether an event is currently open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Active { since: DateTime<Local> },
}

/// Edge reported by [`EventStateMachine::observe`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Started(DateTime<Local>),
    Ended(MotionEvent),
}

/// Converts a noisy per-frame motion signal into start/stop events
///
/// Time is always supplied by the caller. Same-state observations are no-ops.
#[derive(Debug, Clone)]
pub struct EventStateMachine {
    state: MotionState,
    events: VecDeque<MotionEvent>,
    stats: DetectionStats,
    max_events: Option<usize>,
}

impl Default for EventStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStateMachine {
    /// Unbounded event history
    pub fn new() -> Self {
        Self {
            state: MotionState::Idle,
            events: VecDeque::new(),
            stats: DetectionStats::default(),
            max_events: None,
        }
    }

    /// Keep at most `max_events` closed events, evicting the oldest
    pub fn with_retention(max_events: Option<usize>) -> Self {
        Self {
            max_events: max_events.map(|n| n.max(1)),
            ..Self::new()
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, MotionState::Active { .. })
    }

    /// Start of the open event, if any
    pub fn active_since(&self) -> Option<DateTime<Local>> {
        match self.state {
            MotionState::Active { since } => Some(since),
            MotionState::Idle => None,
        }
    }

    /// Feed one frame's motion flag
    pub fn observe(&mut self, motion: bool, now: DateTime<Local>) -> Option<Transition> {
        match (self.state, motion) {
            (MotionState::Idle, true) => {
                self.state = MotionState::Active { since: now };
                self.stats.total_detections += 1;
                self.stats.last_detection = Some(now);
                info!(
                    started = %now,
                    total_detections = self.stats.total_detections,
                    "Motion started"
                );
                Some(Transition::Started(now))
            }
            (MotionState::Active { since }, false) => {
                let event = self.finish(since, now);
                Some(Transition::Ended(event))
            }
            _ => None,
        }
    }

    /// Close an open event at `now`, as if motion had just stopped
    pub fn close_open_event(&mut self, now: DateTime<Local>) -> Option<MotionEvent> {
        match self.state {
            MotionState::Active { since } => Some(self.finish(since, now)),
            MotionState::Idle => None,
        }
    }

    fn finish(&mut self, since: DateTime<Local>, now: DateTime<Local>) -> MotionEvent {
        let event = MotionEvent::new(since, now);
        self.state = MotionState::Idle;
        self.events.push_back(event);
        self.stats.total_duration += event.duration;

        if let Some(max) = self.max_events {
            if self.events.len() > max {
                let evicted = self.events.len() - max;
                self.events.drain(..evicted);
                // Total must equal the sum of the retained durations
                self.stats.total_duration = self.events.iter().map(|e| e.duration).sum();
                debug!(evicted, retained = self.events.len(), "Evicted oldest motion events");
            }
        }

        info!(
            duration_secs = event.duration,
            total_duration = self.stats.total_duration,
            "Motion ended"
        );
        event
    }

    /// Copy of the closed events in chronological order
    pub fn events(&self) -> Vec<MotionEvent> {
        self.events.iter().copied().collect()
    }

    /// Up to `n` most recent events, newest first
    pub fn recent(&self, n: usize) -> Vec<MotionEvent> {
        self.events.iter().rev().take(n).copied().collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn stats(&self) -> DetectionStats {
        self.stats
    }

    pub fn set_fps(&mut self, fps: f64) {
        self.stats.fps = fps;
    }

    /// Drop closed events and their accumulated duration
    ///
    /// `total_detections` is a lifetime counter and is kept. An open event
    /// stays open.
    pub fn clear(&mut self) {
        let removed = self.events.len();
        self.events.clear();
        self.stats.total_duration = 0.0;
        info!(removed, "Cleared motion event history");
    }
}
