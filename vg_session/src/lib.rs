//! ABOUTME: Detection sessions: a worker thread running frames through the pipeline
//! ABOUTME: Exposes the latest frame, transition notices, live settings and the shared event log

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;
use validator::Validate;
use vg_core::{Clock, Error, Result, SystemClock};
use vg_events::{DetectionStats, EventLog, MotionEvent};
use vg_vision::{Annotator, FrameAnalysis, FrameProcessor, MotionConfig};

pub mod config;
pub mod recorder;
pub mod source;
pub mod worker;

pub use config::{RecordingConfig, SessionConfig};
pub use recorder::{NullRecorder, Recorder, SnapshotRecorder};
pub use source::{FrameSource, ImageSequenceSource, VecSource};
pub use worker::{FpsCounter, SessionEvent, SessionExit};

use worker::Worker;

/// Builder for a detection session
pub struct MotionSession {
    config: SessionConfig,
    detection: MotionConfig,
    recording: RecordingConfig,
    clock: Arc<dyn Clock>,
    recorder: Option<Box<dyn Recorder>>,
    annotator: Annotator,
}

impl MotionSession {
    pub fn new(config: SessionConfig, detection: MotionConfig, recording: RecordingConfig) -> Self {
        Self {
            config,
            detection,
            recording,
            clock: Arc::new(SystemClock),
            recorder: None,
            annotator: Annotator::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default snapshot recorder
    pub fn with_recorder(mut self, recorder: Box<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Validate settings and spawn the worker on its own thread
    pub fn start(self, source: Box<dyn FrameSource>) -> Result<SessionHandle> {
        self.detection.check()?;
        self.config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid session settings: {}", e)))?;

        let (settings_tx, settings_rx) = watch::channel(Arc::new(self.detection.clone()));
        let (frames_tx, frames_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let log = EventLog::with_retention(self.config.max_events);
        let recording = Arc::new(AtomicBool::new(self.recording.enabled));
        let recorder = self
            .recorder
            .unwrap_or_else(|| Box::new(SnapshotRecorder::new(self.recording.output_dir.clone())));

        let worker = Worker {
            source,
            processor: FrameProcessor::with_annotator(&self.detection, self.annotator),
            recorder,
            log: log.clone(),
            clock: self.clock,
            settings: settings_rx,
            frames: frames_tx,
            events: events_tx,
            cancel: cancel.clone(),
            recording: Arc::clone(&recording),
            config: self.config,
        };

        let thread = std::thread::Builder::new()
            .name("vigil-worker".to_string())
            .spawn(move || worker.run())?;

        info!(
            algorithm = self.detection.algorithm.name(),
            recording = self.recording.enabled,
            "Detection session started"
        );

        Ok(SessionHandle {
            settings: settings_tx,
            frames: frames_rx,
            events: events_rx,
            log,
            cancel,
            recording,
            thread: Some(thread),
        })
    }
}

/// Control surface for a running session
///
/// Dropping the handle requests a stop without waiting for the worker.
pub struct SessionHandle {
    settings: watch::Sender<Arc<MotionConfig>>,
    frames: watch::Receiver<Option<Arc<FrameAnalysis>>>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    log: EventLog,
    cancel: CancellationToken,
    recording: Arc<AtomicBool>,
    thread: Option<JoinHandle<SessionExit>>,
}

impl SessionHandle {
    /// Publish a new detection settings snapshot, picked up from the next frame
    ///
    /// Invalid settings are rejected and the current snapshot stays in force.
    pub fn update_settings(&self, detection: MotionConfig) -> Result<()> {
        detection.check()?;
        info!(
            algorithm = detection.algorithm.name(),
            sensitivity = detection.sensitivity,
            min_area = detection.min_area,
            "Detection settings updated"
        );
        self.settings.send_replace(Arc::new(detection));
        Ok(())
    }

    pub fn settings(&self) -> Arc<MotionConfig> {
        Arc::clone(&self.settings.borrow())
    }

    pub fn set_recording(&self, enabled: bool) {
        self.recording.store(enabled, Ordering::Relaxed);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Most recent processed frame
    pub fn latest_frame(&self) -> Option<Arc<FrameAnalysis>> {
        self.frames.borrow().clone()
    }

    /// Receiver notified whenever a new frame is published
    pub fn subscribe_frames(&self) -> watch::Receiver<Option<Arc<FrameAnalysis>>> {
        self.frames.clone()
    }

    /// Next transition notice; `None` once the worker has exited and all notices are drained
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Shared event log, readable while the worker runs
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> DetectionStats {
        self.log.stats()
    }

    /// Consistent copy of the event list and statistics
    pub fn snapshot(&self) -> (Vec<MotionEvent>, DetectionStats) {
        self.log.snapshot()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the worker to stop after its current frame
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker to exit on its own
    pub async fn wait(mut self) -> SessionExit {
        let Some(thread) = self.thread.take() else {
            return SessionExit::Stopped;
        };
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(exit)) => exit,
            _ => SessionExit::WorkerPanicked,
        }
    }

    /// Request a stop and wait for the worker
    pub async fn stop(self) -> SessionExit {
        self.request_stop();
        self.wait().await
    }

    /// Blocking variant of [`SessionHandle::stop`] for non-async callers
    pub fn stop_blocking(mut self) -> SessionExit {
        self.request_stop();
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(exit)) => exit,
            Some(Err(_)) => SessionExit::WorkerPanicked,
            None => SessionExit::Stopped,
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}
