//! ABOUTME: Runs one frame through the foreground model, blob extractor and annotator
//! ABOUTME: Yields the motion flag, annotated copy and region list for downstream consumers

use crate::{
    build_model, Annotator, BlobExtractor, ForegroundModel, MotionAlgorithm, MotionConfig, Region,
    StatusOverlay,
};
use chrono::{DateTime, Local};
use image::RgbImage;
use tracing::{debug, info};
use vg_core::{Error, MonotonicTimer, Result};

/// Per-call inputs that come from outside the detector
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Capture time shown on the overlay
    pub timestamp: DateTime<Local>,
    /// Live frame rate shown on the overlay
    pub fps: f64,
}

/// Result of processing a single frame
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// True iff at least one region survived the area threshold
    pub motion_present: bool,
    /// Copy of the input with boxes and overlay drawn on it
    pub annotated: RgbImage,
    pub regions: Vec<Region>,
    pub overlay: StatusOverlay,
    pub algorithm: MotionAlgorithm,
    /// Regions were suppressed because the background model is still learning
    pub warming_up: bool,
    pub processing_time_ms: f64,
}

/// Orchestrates detection for a stream of frames
pub struct FrameProcessor {
    model: Box<dyn ForegroundModel>,
    extractor: BlobExtractor,
    annotator: Annotator,
}

impl FrameProcessor {
    pub fn new(config: &MotionConfig) -> Self {
        Self::with_annotator(config, Annotator::new())
    }

    pub fn with_annotator(config: &MotionConfig, annotator: Annotator) -> Self {
        info!(
            algorithm = config.algorithm.name(),
            min_area = config.min_area,
            "Creating frame processor"
        );
        Self {
            model: build_model(config),
            extractor: BlobExtractor::new(config.min_area),
            annotator,
        }
    }

    pub fn algorithm(&self) -> MotionAlgorithm {
        self.model.algorithm()
    }

    /// Frames folded into the active model since it was built or reset
    pub fn frames_seen(&self) -> u64 {
        self.model.frames_seen()
    }

    /// Forget learned background state
    pub fn reset(&mut self) {
        self.model.reset();
    }

    /// Detect motion in `frame` using the settings snapshot `config`
    ///
    /// Switching `config.algorithm` between calls replaces the model, so the
    /// new model starts from scratch.
    pub fn process(
        &mut self,
        frame: &RgbImage,
        config: &MotionConfig,
        ctx: FrameContext,
    ) -> Result<FrameAnalysis> {
        let timer = MonotonicTimer::new();
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Validation(format!(
                "Rejecting malformed frame {}x{}",
                width, height
            )));
        }

        if config.algorithm != self.model.algorithm() {
            info!(
                from = self.model.algorithm().name(),
                to = config.algorithm.name(),
                "Switching foreground model"
            );
            self.model = build_model(config);
        } else {
            self.model.apply_settings(config);
        }
        self.extractor.set_min_area(config.min_area);

        let algorithm = self.model.algorithm();
        let mask = self.model.classify(frame)?;
        let mut regions = self.extractor.extract(&mask);

        let warming_up = algorithm == MotionAlgorithm::BackgroundModel
            && self.model.frames_seen() <= config.warmup_frames as u64;
        if warming_up && !regions.is_empty() {
            debug!(
                frame = self.model.frames_seen(),
                warmup_frames = config.warmup_frames,
                suppressed = regions.len(),
                "Suppressing regions during warm-up"
            );
            regions.clear();
        }

        let motion_present = !regions.is_empty();
        let overlay = StatusOverlay::new(motion_present, ctx.timestamp, ctx.fps);
        let annotated = self.annotator.annotate(
            frame,
            &regions,
            &overlay,
            algorithm == MotionAlgorithm::BackgroundModel,
        );

        let processing_time_ms = timer.elapsed().as_secs_f64() * 1000.0;
        debug!(
            algorithm = algorithm.name(),
            motion = motion_present,
            regions = regions.len(),
            processing_time_ms,
            "Processed frame"
        );

        Ok(FrameAnalysis {
            motion_present,
            annotated,
            regions,
            overlay,
            algorithm,
            warming_up,
            processing_time_ms,
        })
    }
}
