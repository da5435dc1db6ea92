//! ABOUTME: Adaptive per-pixel Gaussian mixture background model with shadow detection
//! ABOUTME: Learns up to five color modes per pixel and labels pixels background, shadow or foreground

use crate::{
    ForegroundModel, MotionAlgorithm, MotionConfig, MASK_BACKGROUND, MASK_FOREGROUND, MASK_SHADOW,
};
use image::{GrayImage, Luma, RgbImage};
use std::cmp::Ordering;
use tracing::{debug, trace};
use vg_core::{Error, Result};

/// Fixed tuning of the mixture model
///
/// Only `var_threshold` is user-facing (the `bg_threshold` setting); the rest
/// are the customary defaults for this family of background subtractors.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureParams {
    /// Maximum Gaussian modes kept per pixel
    pub max_modes: usize,
    /// Squared Mahalanobis distance deciding whether a pixel is background
    pub var_threshold: f32,
    /// Squared Mahalanobis distance deciding whether a pixel updates a mode
    pub var_threshold_gen: f32,
    /// Share of total weight that the background modes make up
    pub background_ratio: f32,
    pub var_init: f32,
    pub var_min: f32,
    pub var_max: f32,
    /// Weight pulled from every mode each frame so unused modes die off
    pub complexity_reduction: f32,
    /// Whether darker copies of a background mode are labelled shadow
    pub detect_shadows: bool,
    /// Lowest brightness ratio still accepted as shadow
    pub shadow_threshold: f32,
}

impl Default for MixtureParams {
    fn default() -> Self {
        Self {
            max_modes: 5,
            var_threshold: 16.0,
            var_threshold_gen: 9.0,
            background_ratio: 0.9,
            var_init: 15.0,
            var_min: 4.0,
            var_max: 75.0,
            complexity_reduction: 0.05,
            detect_shadows: true,
            shadow_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    weight: f32,
    variance: f32,
    mean: [f32; 3],
}

impl Mode {
    fn seeded(data: [f32; 3], weight: f32, variance: f32) -> Self {
        Self {
            weight,
            variance,
            mean: data,
        }
    }

    fn distance2(&self, data: &[f32; 3]) -> f32 {
        self.mean
            .iter()
            .zip(data.iter())
            .map(|(m, d)| (m - d) * (m - d))
            .sum()
    }
}

/// Online Gaussian mixture background estimator
pub struct MixtureBackgroundModel {
    params: MixtureParams,
    history: u32,
    width: u32,
    height: u32,
    /// `width * height * max_modes` modes, each pixel's slice sorted by weight
    modes: Vec<Mode>,
    /// Modes in use per pixel
    used: Vec<u8>,
    frames_seen: u64,
}

impl MixtureBackgroundModel {
    /// Create an empty model; the first classified frame seeds it
    pub fn new(config: &MotionConfig) -> Self {
        let params = MixtureParams {
            var_threshold: config.bg_threshold,
            ..MixtureParams::default()
        };
        Self::with_params(params, config.history)
    }

    /// Create a model with explicit tuning
    pub fn with_params(params: MixtureParams, history: u32) -> Self {
        Self {
            params,
            history: history.max(1),
            width: 0,
            height: 0,
            modes: Vec::new(),
            used: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn params(&self) -> &MixtureParams {
        &self.params
    }

    /// Learning rate for the next frame: fast at first, settling at `1 / history`
    pub fn learning_rate(&self) -> f32 {
        let frames = self.frames_seen.saturating_add(1);
        let window = frames.saturating_mul(2).min(self.history as u64).max(1);
        1.0 / window as f32
    }

    /// Classify a frame into background, shadow and foreground labels
    ///
    /// Returns a mask holding [`MASK_BACKGROUND`], [`MASK_SHADOW`] or
    /// [`MASK_FOREGROUND`] per pixel and folds the frame into the model.
    pub fn apply(&mut self, frame: &RgbImage) -> Result<GrayImage> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Validation(format!(
                "Cannot classify empty frame {}x{}",
                width, height
            )));
        }

        if self.modes.is_empty() || (width, height) != (self.width, self.height) {
            if !self.modes.is_empty() {
                debug!(
                    old_width = self.width,
                    old_height = self.height,
                    width,
                    height,
                    "Frame size changed, reseeding background model"
                );
            }
            self.seed(frame);
            return Ok(GrayImage::from_pixel(width, height, Luma([MASK_BACKGROUND])));
        }

        self.frames_seen += 1;
        let alpha = self.learning_rate();
        let params = &self.params;
        let k = params.max_modes;
        let mut mask = GrayImage::new(width, height);
        let mut foreground = 0usize;
        let mut shadows = 0usize;

        for ((pixel_modes, used), (pixel, label)) in self
            .modes
            .chunks_mut(k)
            .zip(self.used.iter_mut())
            .zip(frame.pixels().zip(mask.iter_mut()))
        {
            let data = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
            *label = update_pixel(pixel_modes, used, data, alpha, params);
            match *label {
                MASK_FOREGROUND => foreground += 1,
                MASK_SHADOW => shadows += 1,
                _ => {}
            }
        }

        trace!(
            frame = self.frames_seen,
            alpha,
            foreground,
            shadows,
            "Background model updated"
        );

        Ok(mask)
    }

    fn seed(&mut self, frame: &RgbImage) {
        let (width, height) = frame.dimensions();
        let k = self.params.max_modes;
        let pixels = (width as usize) * (height as usize);

        self.width = width;
        self.height = height;
        self.modes = vec![Mode::default(); pixels * k];
        self.used = vec![1; pixels];

        for (pixel_modes, pixel) in self.modes.chunks_mut(k).zip(frame.pixels()) {
            let data = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
            pixel_modes[0] = Mode::seeded(data, 1.0, self.params.var_init);
        }

        self.frames_seen = 1;
        debug!(width, height, modes = k, "Seeded background model");
    }
}

/// Fold one pixel into its modes and return its label
fn update_pixel(
    modes: &mut [Mode],
    used: &mut u8,
    data: [f32; 3],
    alpha: f32,
    params: &MixtureParams,
) -> u8 {
    let decay = 1.0 - alpha;
    let prune = alpha * params.complexity_reduction;
    let in_use = *used as usize;

    let mut background = false;
    let mut matched = false;
    let mut total_weight = 0.0f32;

    for mode in modes[..in_use].iter_mut() {
        mode.weight = decay * mode.weight - prune;

        if !matched {
            let dist2 = mode.distance2(&data);

            if total_weight < params.background_ratio
                && dist2 < params.var_threshold * mode.variance
            {
                background = true;
            }

            if dist2 < params.var_threshold_gen * mode.variance {
                matched = true;
                mode.weight += alpha;
                let k = alpha / mode.weight;
                for (m, d) in mode.mean.iter_mut().zip(data.iter()) {
                    *m -= k * (*m - d);
                }
                let variance = mode.variance + k * (dist2 - mode.variance);
                mode.variance = variance.clamp(params.var_min, params.var_max);
            }
        }

        total_weight += mode.weight;
    }

    // Drop modes that have decayed away
    let mut kept = 0;
    for i in 0..in_use {
        if modes[i].weight >= prune {
            modes[kept] = modes[i];
            kept += 1;
        }
    }

    let total: f32 = modes[..kept].iter().map(|m| m.weight).sum();
    if total > 0.0 {
        for mode in modes[..kept].iter_mut() {
            mode.weight /= total;
        }
    }
    modes[..kept].sort_unstable_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
    });

    // Shadows are judged against the modes learned before this frame
    let label = if background {
        MASK_BACKGROUND
    } else if params.detect_shadows && is_shadow(&modes[..kept], &data, params) {
        MASK_SHADOW
    } else {
        MASK_FOREGROUND
    };

    if !matched {
        if kept == 0 {
            modes[0] = Mode::seeded(data, 1.0, params.var_init);
            kept = 1;
        } else {
            let slot = if kept == params.max_modes {
                kept - 1
            } else {
                kept += 1;
                kept - 1
            };
            for mode in modes[..slot].iter_mut() {
                mode.weight *= decay;
            }
            modes[slot] = Mode::seeded(data, alpha, params.var_init);

            let mut i = slot;
            while i > 0 && modes[i].weight > modes[i - 1].weight {
                modes.swap(i, i - 1);
                i -= 1;
            }
        }
    }
    *used = kept as u8;

    label
}

/// A pixel is shadow when it is a uniformly darker copy of a background mode
fn is_shadow(modes: &[Mode], data: &[f32; 3], params: &MixtureParams) -> bool {
    let mut total_weight = 0.0f32;

    for mode in modes {
        let numerator: f32 = mode.mean.iter().zip(data.iter()).map(|(m, d)| m * d).sum();
        let denominator: f32 = mode.mean.iter().map(|m| m * m).sum();

        if denominator == 0.0 {
            return false;
        }

        if numerator <= denominator && numerator >= params.shadow_threshold * denominator {
            let a = numerator / denominator;
            let dist2a: f32 = mode
                .mean
                .iter()
                .zip(data.iter())
                .map(|(m, d)| {
                    let diff = a * m - d;
                    diff * diff
                })
                .sum();

            if dist2a < params.var_threshold * mode.variance * a * a {
                return true;
            }
        }

        total_weight += mode.weight;
        if total_weight > params.background_ratio {
            return false;
        }
    }

    false
}

impl ForegroundModel for MixtureBackgroundModel {
    fn classify(&mut self, frame: &RgbImage) -> Result<GrayImage> {
        let mut mask = self.apply(frame)?;
        // Shadows count as background in the binary output
        for value in mask.iter_mut() {
            if *value != MASK_FOREGROUND {
                *value = MASK_BACKGROUND;
            }
        }
        Ok(mask)
    }

    fn apply_settings(&mut self, config: &MotionConfig) {
        self.params.var_threshold = config.bg_threshold;
        self.history = config.history.max(1);
    }

    fn reset(&mut self) {
        debug!("Resetting background model");
        self.modes.clear();
        self.used.clear();
        self.width = 0;
        self.height = 0;
        self.frames_seen = 0;
    }

    fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn algorithm(&self) -> MotionAlgorithm {
        MotionAlgorithm::BackgroundModel
    }
}
