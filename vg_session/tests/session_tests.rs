//! ABOUTME: End-to-end session tests over synthetic frame sequences
//! ABOUTME: Checks transitions, stop handling, retries, recording and live settings

use chrono::Duration;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use test_support::monday_at;
use vg_core::{Error, ManualClock, Result};
use vg_session::{
    FrameSource, MotionSession, RecordingConfig, SessionConfig, SessionEvent, SessionExit,
    VecSource,
};
use vg_vision::utils::create_test_frame_with_motion;
use vg_vision::{MotionAlgorithm, MotionConfig};

const W: u32 = 320;
const H: u32 = 240;

fn background() -> RgbImage {
    RgbImage::from_pixel(W, H, Rgb([64, 64, 64]))
}

fn block_at(x: u32, y: u32) -> RgbImage {
    create_test_frame_with_motion(W, H, x, y, 100, 80, 200)
}

fn frame_difference() -> MotionConfig {
    MotionConfig {
        algorithm: MotionAlgorithm::FrameDifference,
        ..Default::default()
    }
}

fn stepping_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::with_step(monday_at(14, 0, 0), Duration::seconds(1)))
}

async fn drain(handle: &mut vg_session::SessionHandle) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

/// Blocks until the test hands it a frame; a dropped sender ends the stream
struct ChannelSource(std::sync::mpsc::Receiver<RgbImage>);

impl FrameSource for ChannelSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.0.recv().ok())
    }
}

#[tokio::test]
async fn test_motion_sequence_produces_one_event() {
    // Differences: -, F, T, T, T, T, F
    let frames = vec![
        background(),
        background(),
        block_at(10, 10),
        block_at(160, 10),
        block_at(10, 140),
        background(),
        background(),
    ];
    let t0 = monday_at(14, 0, 0);
    let mut handle = MotionSession::new(
        SessionConfig::default(),
        frame_difference(),
        RecordingConfig::default(),
    )
    .with_clock(stepping_clock())
    .start(Box::new(VecSource::new(frames)))
    .unwrap();

    let events = drain(&mut handle).await;
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        SessionEvent::MotionStarted {
            at: t0 + Duration::seconds(2)
        }
    );
    let SessionEvent::MotionEnded { event, snapshot } = &events[1] else {
        panic!("expected MotionEnded, got {:?}", events[1]);
    };
    assert_eq!(event.start, t0 + Duration::seconds(2));
    assert_eq!(event.end, t0 + Duration::seconds(6));
    assert_eq!(event.duration, 4.0);
    assert!(snapshot.is_none());

    let (logged, stats) = handle.snapshot();
    assert_eq!(stats.total_detections, 1);
    assert_eq!(stats.total_duration, 4.0);
    assert_eq!(logged, vec![*event]);
    assert_eq!(handle.stats(), stats);

    let latest = handle.latest_frame().unwrap();
    assert!(!latest.motion_present);
    assert_eq!(latest.annotated.dimensions(), (W, H));

    assert_eq!(handle.wait().await, SessionExit::EndOfStream);
}

#[tokio::test]
async fn test_stream_ending_mid_motion_closes_event() {
    let frames = vec![background(), background(), block_at(10, 10), block_at(160, 10)];
    let t0 = monday_at(14, 0, 0);
    let mut handle = MotionSession::new(
        SessionConfig::default(),
        frame_difference(),
        RecordingConfig::default(),
    )
    .with_clock(stepping_clock())
    .start(Box::new(VecSource::new(frames)))
    .unwrap();

    let events = drain(&mut handle).await;
    assert_eq!(events.len(), 2);
    let SessionEvent::MotionEnded { event, .. } = &events[1] else {
        panic!("expected MotionEnded, got {:?}", events[1]);
    };
    assert_eq!(event.start, t0 + Duration::seconds(2));
    assert_eq!(event.end, t0 + Duration::seconds(4));

    let stats = handle.stats();
    assert_eq!(stats.total_detections, handle.log().len() as u64);
    assert_eq!(stats.total_duration, 2.0);
}

#[tokio::test]
async fn test_open_event_left_open_when_configured() {
    let frames = vec![background(), background(), block_at(10, 10), block_at(160, 10)];
    let config = SessionConfig {
        close_open_event_on_stop: false,
        ..Default::default()
    };
    let mut handle = MotionSession::new(config, frame_difference(), RecordingConfig::default())
        .with_clock(stepping_clock())
        .start(Box::new(VecSource::new(frames)))
        .unwrap();

    let events = drain(&mut handle).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], SessionEvent::MotionStarted { .. }));
    assert_eq!(handle.stats().total_detections, 1);
    assert!(handle.log().is_empty());
}

#[tokio::test]
async fn test_snapshot_published_with_event() {
    let dir = tempfile::tempdir().unwrap();
    let recording = RecordingConfig {
        enabled: true,
        output_dir: dir.path().join("snapshots"),
    };
    let frames = vec![
        background(),
        background(),
        block_at(10, 10),
        block_at(160, 10),
        background(),
        background(),
    ];
    let mut handle = MotionSession::new(SessionConfig::default(), frame_difference(), recording)
        .with_clock(stepping_clock())
        .start(Box::new(VecSource::new(frames)))
        .unwrap();

    let events = drain(&mut handle).await;
    let Some(SessionEvent::MotionEnded {
        snapshot: Some(path),
        ..
    }) = events.last()
    else {
        panic!("expected a snapshot, got {:?}", events);
    };
    assert!(path.ends_with("motion_20240115_140002_000.jpg"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_persistent_acquisition_failure_stops_worker() {
    let reads = vec![Some(background()), None, None, None, Some(background())];
    let config = SessionConfig {
        max_consecutive_failures: 3,
        retry_backoff_ms: 0,
        ..Default::default()
    };
    let handle = MotionSession::new(config, frame_difference(), RecordingConfig::default())
        .with_clock(stepping_clock())
        .start(Box::new(VecSource::from_reads(reads)))
        .unwrap();

    assert_eq!(
        handle.wait().await,
        SessionExit::AcquisitionFailed { failures: 3 }
    );
}

#[tokio::test]
async fn test_intermittent_failures_and_bad_frames_are_skipped() {
    let reads = vec![
        Some(background()),
        None,
        Some(RgbImage::new(0, 0)),
        None,
        Some(background()),
    ];
    let config = SessionConfig {
        max_consecutive_failures: 2,
        retry_backoff_ms: 1,
        ..Default::default()
    };
    let handle = MotionSession::new(config, frame_difference(), RecordingConfig::default())
        .with_clock(stepping_clock())
        .start(Box::new(VecSource::from_reads(reads)))
        .unwrap();

    let log = handle.log().clone();
    assert_eq!(handle.wait().await, SessionExit::EndOfStream);
    assert_eq!(log.stats().total_detections, 0);
}

#[tokio::test]
async fn test_live_settings_apply_from_next_frame() {
    let (tx, rx) = std::sync::mpsc::channel();
    let strict = MotionConfig {
        min_area: 1_000_000,
        ..frame_difference()
    };
    let handle = MotionSession::new(SessionConfig::default(), strict, RecordingConfig::default())
        .with_clock(stepping_clock())
        .start(Box::new(ChannelSource(rx)))
        .unwrap();
    let mut frames = handle.subscribe_frames();
    let wait = std::time::Duration::from_secs(10);

    tx.send(background()).unwrap();
    tokio::time::timeout(wait, frames.changed()).await.unwrap().unwrap();
    tx.send(block_at(10, 10)).unwrap();
    tokio::time::timeout(wait, frames.changed()).await.unwrap().unwrap();
    assert!(!handle.latest_frame().unwrap().motion_present);

    let rejected = MotionConfig {
        blur_kernel: 20,
        ..frame_difference()
    };
    assert!(matches!(handle.update_settings(rejected), Err(Error::Config(_))));
    assert_eq!(handle.settings().min_area, 1_000_000);

    handle.update_settings(frame_difference()).unwrap();
    tx.send(block_at(160, 10)).unwrap();
    tokio::time::timeout(wait, frames.changed()).await.unwrap().unwrap();
    assert!(handle.latest_frame().unwrap().motion_present);

    handle.request_stop();
    drop(tx);
    assert_eq!(handle.wait().await, SessionExit::Stopped);
}

#[test]
fn test_invalid_settings_abort_start() {
    let detection = MotionConfig {
        blur_kernel: 4,
        ..Default::default()
    };
    let result = MotionSession::new(SessionConfig::default(), detection, RecordingConfig::default())
        .start(Box::new(VecSource::new(Vec::new())));
    assert!(matches!(result, Err(Error::Config(_))));
}
