//! ABOUTME: Per-frame motion classification with frame-difference and mixture-model backgrounds
//! ABOUTME: Foreground modeling, blob extraction, frame annotation and the frame processor

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub mod annotate;
pub mod blobs;
pub mod frame_diff;
pub mod mixture;
pub mod processor;

pub use annotate::{Annotator, StatusOverlay};
pub use blobs::BlobExtractor;
pub use frame_diff::FrameDifferenceModel;
pub use mixture::MixtureBackgroundModel;
pub use processor::{FrameAnalysis, FrameContext, FrameProcessor};

// Re-export image types for callers and benchmarks
pub use image;

/// Mask value for a background pixel
pub const MASK_BACKGROUND: u8 = 0;
/// Mask value the mixture model assigns to a cast shadow
pub const MASK_SHADOW: u8 = 127;
/// Mask value for a foreground pixel
pub const MASK_FOREGROUND: u8 = 255;

/// Detection settings snapshot
///
/// One snapshot is handed to every frame-processing call; live tuning means
/// publishing a new snapshot, never mutating one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_odd_kernel"))]
pub struct MotionConfig {
    /// Foreground model to run
    pub algorithm: MotionAlgorithm,
    /// Grey-level delta a pixel must exceed in frame-difference mode
    #[validate(range(min = 1, max = 254))]
    pub sensitivity: u8,
    /// Minimum contour area for a region to count as motion (pixels)
    #[validate(range(min = 1, max = 10_000_000))]
    pub min_area: u32,
    /// Squared Mahalanobis distance under which a pixel matches the background
    #[validate(range(min = 1.0, max = 1000.0))]
    pub bg_threshold: f32,
    /// Gaussian blur kernel size for frame-difference mode (odd)
    #[validate(range(min = 1, max = 99))]
    pub blur_kernel: u32,
    /// Dilation passes applied to the thresholded difference mask
    #[validate(range(max = 20))]
    pub dilation_iterations: u8,
    /// Frames of history the mixture model learns over
    #[validate(range(min = 1, max = 100_000))]
    pub history: u32,
    /// Frames during which the mixture model may not report motion
    #[validate(range(max = 100_000))]
    pub warmup_frames: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            algorithm: MotionAlgorithm::BackgroundModel,
            sensitivity: 50,
            min_area: 5000,
            bg_threshold: 16.0,
            blur_kernel: 21,
            dilation_iterations: 2,
            history: 500,
            warmup_frames: 0,
        }
    }
}

fn validate_odd_kernel(config: &MotionConfig) -> Result<(), ValidationError> {
    let kernel = config.blur_kernel;
    if kernel % 2 == 1 {
        Ok(())
    } else {
        let mut err = ValidationError::new("odd_kernel");
        err.message = Some(format!("blur kernel must be odd, got {}", kernel).into());
        Err(err)
    }
}

impl MotionConfig {
    /// Validate the snapshot, mapping failures onto the core error type
    pub fn check(&self) -> vg_core::Result<()> {
        self.validate()
            .map_err(|e| vg_core::Error::Config(format!("Invalid detection settings: {}", e)))
    }
}

/// Available foreground models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MotionAlgorithm {
    /// Blurred grayscale difference against the previous frame
    #[serde(alias = "simple")]
    FrameDifference,
    /// Adaptive per-pixel Gaussian mixture background
    #[default]
    #[serde(alias = "mog2")]
    BackgroundModel,
}

impl MotionAlgorithm {
    /// Short name used in logs and overlays
    pub fn name(&self) -> &'static str {
        match self {
            MotionAlgorithm::FrameDifference => "simple",
            MotionAlgorithm::BackgroundModel => "background_model",
        }
    }
}

/// Axis-aligned box around one connected foreground cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Area enclosed by the cluster's outer boundary
    pub area: f64,
}

impl Region {
    /// Integer center of the bounding box
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Classifies pixels of a color frame as foreground or background
///
/// Implementations keep whatever per-pixel history they need between calls.
/// The returned mask has the frame's dimensions and holds only
/// [`MASK_BACKGROUND`] or [`MASK_FOREGROUND`]; shadows count as background.
pub trait ForegroundModel: Send {
    /// Classify one frame and fold it into the model
    fn classify(&mut self, frame: &RgbImage) -> vg_core::Result<GrayImage>;

    /// Pick up tunable parameters from a new settings snapshot
    fn apply_settings(&mut self, config: &MotionConfig);

    /// Drop all learned state
    fn reset(&mut self);

    /// Number of frames folded into the model since the last reset
    fn frames_seen(&self) -> u64;

    /// Which algorithm this is
    fn algorithm(&self) -> MotionAlgorithm;
}

/// Build the foreground model selected by `config`
pub fn build_model(config: &MotionConfig) -> Box<dyn ForegroundModel> {
    match config.algorithm {
        MotionAlgorithm::FrameDifference => Box::new(FrameDifferenceModel::new(config)),
        MotionAlgorithm::BackgroundModel => Box::new(MixtureBackgroundModel::new(config)),
    }
}

/// Utility functions for synthetic frames
pub mod utils {
    use image::{Rgb, RgbImage};

    /// Create a uniform frame with a solid block of another color
    pub fn create_test_frame_with_motion(
        width: u32,
        height: u32,
        motion_x: u32,
        motion_y: u32,
        motion_width: u32,
        motion_height: u32,
        intensity: u8,
    ) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([64, 64, 64])); // Dark gray background
        fill_block(
            &mut img,
            motion_x,
            motion_y,
            motion_width,
            motion_height,
            Rgb([intensity, intensity, intensity]),
        );
        img
    }

    /// Paint a rectangle, clipped to the image
    pub fn fill_block(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        let (width, height) = img.dimensions();
        for py in y..(y + h).min(height) {
            for px in x..(x + w).min(width) {
                img.put_pixel(px, py, color);
            }
        }
    }

    /// Create a background frame and a frame with a bright block
    pub fn create_test_frame_pair(width: u32, height: u32) -> (RgbImage, RgbImage) {
        let frame1 = RgbImage::from_pixel(width, height, Rgb([64, 64, 64]));
        let frame2 = create_test_frame_with_motion(width, height, 10, 10, 50, 50, 200);
        (frame1, frame2)
    }
}
