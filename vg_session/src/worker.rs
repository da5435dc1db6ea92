//! ABOUTME: Background loop pulling frames through detection and the event log
//! ABOUTME: Publishes annotated frames and transitions, retries acquisition, honors cancellation

use chrono::{DateTime, Local};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vg_core::Clock;
use vg_events::{EventLog, MotionEvent, Transition};
use vg_vision::{FrameAnalysis, FrameContext, FrameProcessor, MotionConfig};

use crate::{FrameSource, Recorder, SessionConfig};

/// Longest single sleep while backing off, so cancellation stays prompt
const BACKOFF_SLICE: Duration = Duration::from_millis(20);

/// Transition notice sent to session listeners
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MotionStarted {
        at: DateTime<Local>,
    },
    MotionEnded {
        event: MotionEvent,
        /// Recorder artifact for this event, if recording was on
        snapshot: Option<PathBuf>,
    },
}

/// Why the worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// Cancellation was requested
    Stopped,
    /// The source ran out of frames
    EndOfStream,
    /// Too many acquisition failures in a row
    AcquisitionFailed { failures: u32 },
    /// The worker thread panicked
    WorkerPanicked,
}

/// Frames-per-second over one-second windows
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame; returns the new rate when a window closes
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

pub(crate) struct Worker {
    pub source: Box<dyn FrameSource>,
    pub processor: FrameProcessor,
    pub recorder: Box<dyn Recorder>,
    pub log: EventLog,
    pub clock: Arc<dyn Clock>,
    pub settings: watch::Receiver<Arc<MotionConfig>>,
    pub frames: watch::Sender<Option<Arc<FrameAnalysis>>>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub cancel: CancellationToken,
    pub recording: Arc<AtomicBool>,
    pub config: SessionConfig,
}

impl Worker {
    pub fn run(mut self) -> SessionExit {
        info!(source = %self.source.describe(), "Detection worker started");
        let mut fps = FpsCounter::new(Instant::now());
        let mut failures = 0u32;
        let mut recording_active = false;

        let exit = loop {
            if self.cancel.is_cancelled() {
                break SessionExit::Stopped;
            }

            let read = self.source.read_frame();
            if self.cancel.is_cancelled() {
                break SessionExit::Stopped;
            }

            let frame = match read {
                Ok(Some(frame)) => {
                    failures = 0;
                    frame
                }
                Ok(None) => break SessionExit::EndOfStream,
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "Frame acquisition failed");
                    if failures >= self.config.max_consecutive_failures {
                        break SessionExit::AcquisitionFailed { failures };
                    }
                    self.pause(self.config.retry_backoff());
                    continue;
                }
            };

            if let Some(rate) = fps.tick(Instant::now()) {
                self.log.set_fps(rate);
            }
            self.handle_frame(&frame, fps.fps(), &mut recording_active);
        };

        if self.config.close_open_event_on_stop {
            if let Some(event) = self.log.close_open_event(self.clock.now()) {
                let snapshot = self.finish_recording(&mut recording_active);
                self.publish(SessionEvent::MotionEnded { event, snapshot });
            }
        }

        info!(exit = ?exit, events = self.log.len(), "Detection worker stopped");
        exit
    }

    fn handle_frame(&mut self, frame: &RgbImage, fps: f64, recording_active: &mut bool) {
        // One settings snapshot per frame
        let settings = Arc::clone(&self.settings.borrow());
        let now = self.clock.now();

        let analysis = match self.processor.process(
            frame,
            &settings,
            FrameContext {
                timestamp: now,
                fps,
            },
        ) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Skipping frame");
                return;
            }
        };

        match self.log.observe(analysis.motion_present, now) {
            Some(Transition::Started(at)) => {
                if self.recording.load(Ordering::Relaxed) {
                    match self.recorder.start(at, &analysis.annotated) {
                        Ok(()) => *recording_active = true,
                        Err(e) => warn!(error = %e, "Recorder failed to start"),
                    }
                }
                self.publish(SessionEvent::MotionStarted { at });
            }
            Some(Transition::Ended(event)) => {
                let snapshot = self.finish_recording(recording_active);
                self.publish(SessionEvent::MotionEnded { event, snapshot });
            }
            None => {
                if *recording_active {
                    if let Err(e) = self.recorder.write(&analysis.annotated) {
                        warn!(error = %e, "Recorder failed to write frame");
                    }
                }
            }
        }

        self.frames.send_replace(Some(Arc::new(analysis)));
    }

    fn finish_recording(&mut self, recording_active: &mut bool) -> Option<PathBuf> {
        if !std::mem::take(recording_active) {
            return None;
        }
        match self.recorder.stop() {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Recorder failed to stop");
                None
            }
        }
    }

    fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No listener for session events");
        }
    }

    fn pause(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while !self.cancel.is_cancelled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            std::thread::sleep(left.min(BACKOFF_SLICE));
        }
    }
}
