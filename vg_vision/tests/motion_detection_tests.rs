//! ABOUTME: Integration tests for motion detection over synthetic frame sequences
//! ABOUTME: Covers both foreground models end to end through the frame processor

use vg_vision::{
    image::{GrayImage, Luma, Rgb, RgbImage},
    utils::create_test_frame_with_motion,
    BlobExtractor, FrameContext, FrameProcessor, MotionAlgorithm, MotionConfig,
};

fn ctx() -> FrameContext {
    FrameContext {
        timestamp: test_support::monday_at(14, 0, 0),
        fps: 25.0,
    }
}

fn background() -> RgbImage {
    RgbImage::from_pixel(320, 240, Rgb([64, 64, 64]))
}

fn with_object() -> RgbImage {
    create_test_frame_with_motion(320, 240, 100, 80, 120, 100, 200)
}

fn run(config: &MotionConfig, frames: &[RgbImage]) -> Vec<bool> {
    let mut processor = FrameProcessor::new(config);
    frames
        .iter()
        .map(|frame| processor.process(frame, config, ctx()).unwrap().motion_present)
        .collect()
}

/// Frame difference only reacts to change between consecutive frames
#[test]
fn test_frame_difference_sequence() {
    let config = MotionConfig {
        algorithm: MotionAlgorithm::FrameDifference,
        ..Default::default()
    };
    let frames = vec![
        background(),
        background(),
        with_object(),
        with_object(),
        background(),
        background(),
    ];

    assert_eq!(
        run(&config, &frames),
        vec![false, false, true, false, true, false]
    );
}

/// The background model keeps flagging an object while it is new
#[test]
fn test_background_model_sequence() {
    let config = MotionConfig::default();
    let mut frames: Vec<RgbImage> = (0..10).map(|_| background()).collect();
    frames.push(with_object());
    frames.push(with_object());
    frames.push(background());
    frames.push(background());

    let flags = run(&config, &frames);
    assert!(flags[..10].iter().all(|&m| !m));
    assert_eq!(&flags[10..], &[true, true, false, false]);
}

/// Settings snapshots can change between frames without restarting
#[test]
fn test_live_min_area_change() {
    let mut config = MotionConfig::default();
    let mut processor = FrameProcessor::new(&config);
    for _ in 0..10 {
        processor.process(&background(), &config, ctx()).unwrap();
    }

    config.min_area = 50_000;
    let analysis = processor.process(&with_object(), &config, ctx()).unwrap();
    assert!(!analysis.motion_present);

    config.min_area = 5_000;
    let analysis = processor.process(&with_object(), &config, ctx()).unwrap();
    assert!(analysis.motion_present);
}

/// Two disjoint blobs of roughly 100 and 8000 pixels against min_area 5000
#[test]
fn test_blob_area_threshold() {
    let mut mask = GrayImage::new(400, 300);
    for y in 10..20 {
        for x in 10..20 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    for y in 100..181 {
        for x in 200..301 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    let regions = BlobExtractor::new(5000).extract(&mask);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].x, 200);
    assert_eq!(regions[0].y, 100);
}

/// Annotated output carries the overlay for the frame it came from
#[test]
fn test_overlay_reflects_motion() {
    let config = MotionConfig {
        algorithm: MotionAlgorithm::FrameDifference,
        ..Default::default()
    };
    let mut processor = FrameProcessor::new(&config);

    let idle = processor.process(&background(), &config, ctx()).unwrap();
    assert_eq!(idle.overlay.status, "Monitoring...");
    assert_eq!(idle.overlay.timestamp, "2024-01-15 14:00:00");
    assert_eq!(idle.overlay.fps, "FPS: 25.0");

    let busy = processor.process(&with_object(), &config, ctx()).unwrap();
    assert_eq!(busy.overlay.status, "MOTION DETECTED");
    assert_eq!(busy.annotated.get_pixel(0, 0).0, [255, 0, 0]);
}
