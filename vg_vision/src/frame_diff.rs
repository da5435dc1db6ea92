//! ABOUTME: Frame-difference foreground model on blurred grayscale frames
//! ABOUTME: Thresholds the absolute change against the previous frame and dilates the result

use crate::{ForegroundModel, MotionAlgorithm, MotionConfig, MASK_BACKGROUND, MASK_FOREGROUND};
use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use tracing::debug;
use vg_core::{Error, Result};

/// Stateless-ish detector that only remembers the previous prepared frame
pub struct FrameDifferenceModel {
    sensitivity: u8,
    blur_kernel: u32,
    dilation_iterations: u8,
    previous: Option<GrayImage>,
    frames_seen: u64,
}

impl FrameDifferenceModel {
    /// Create a detector with no previous frame
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            sensitivity: config.sensitivity,
            blur_kernel: config.blur_kernel,
            dilation_iterations: config.dilation_iterations,
            previous: None,
            frames_seen: 0,
        }
    }

    /// Grayscale and blur a frame the same way the stored previous frame was
    pub fn prepare(&self, frame: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        match blur_sigma(self.blur_kernel) {
            Some(sigma) => imageproc::filter::gaussian_blur_f32(&gray, sigma),
            None => gray,
        }
    }

    /// The prepared buffer the next frame will be compared against
    pub fn previous(&self) -> Option<&GrayImage> {
        self.previous.as_ref()
    }

    fn difference_mask(&self, previous: &GrayImage, current: &GrayImage) -> GrayImage {
        let (width, height) = current.dimensions();
        let mut mask = GrayImage::new(width, height);
        let mut changed = 0usize;

        for ((out, prev), curr) in mask.iter_mut().zip(previous.iter()).zip(current.iter()) {
            if prev.abs_diff(*curr) > self.sensitivity {
                *out = MASK_FOREGROUND;
                changed += 1;
            }
        }

        debug!(
            changed_pixels = changed,
            sensitivity = self.sensitivity,
            "Frame difference thresholded"
        );

        if changed > 0 && self.dilation_iterations > 0 {
            // k passes of a 3x3 dilation equal one pass of a (2k+1) square
            mask = imageproc::morphology::dilate(&mask, Norm::LInf, self.dilation_iterations);
        }

        mask
    }
}

/// Gaussian sigma for an odd kernel size, following the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule. `None` means no blur.
pub fn blur_sigma(kernel: u32) -> Option<f32> {
    if kernel <= 1 {
        return None;
    }
    Some(0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8)
}

impl ForegroundModel for FrameDifferenceModel {
    fn classify(&mut self, frame: &RgbImage) -> Result<GrayImage> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Validation(format!(
                "Cannot classify empty frame {}x{}",
                width, height
            )));
        }

        let current = self.prepare(frame);
        let mask = match &self.previous {
            Some(previous) if previous.dimensions() == current.dimensions() => {
                self.difference_mask(previous, &current)
            }
            Some(_) => {
                debug!(width, height, "Frame size changed, restarting frame difference");
                GrayImage::from_pixel(width, height, image::Luma([MASK_BACKGROUND]))
            }
            None => {
                debug!("No previous frame available, storing current frame");
                GrayImage::from_pixel(width, height, image::Luma([MASK_BACKGROUND]))
            }
        };

        self.previous = Some(current);
        self.frames_seen += 1;
        Ok(mask)
    }

    fn apply_settings(&mut self, config: &MotionConfig) {
        self.sensitivity = config.sensitivity;
        self.blur_kernel = config.blur_kernel;
        self.dilation_iterations = config.dilation_iterations;
    }

    fn reset(&mut self) {
        debug!("Resetting frame difference state");
        self.previous = None;
        self.frames_seen = 0;
    }

    fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn algorithm(&self) -> MotionAlgorithm {
        MotionAlgorithm::FrameDifference
    }
}
