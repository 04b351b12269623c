//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::morphology::MAX_ELEMENT_SIZE;
use crate::types::{Color, DebugStage, PipelineError};

/// Tuning parameters for the document detection pipeline.
///
/// Fixed for the lifetime of a [`Pipeline`](crate::Pipeline); build a new
/// pipeline to change them. Missing fields in serialized form take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where the pipeline stops and what it returns.
    pub output_stage: DebugStage,

    /// Cap on the working image's long side, in pixels.
    ///
    /// Oriented frames taller than this are area-downscaled so their
    /// height equals it.
    pub max_image_height: u32,

    /// Side of the square element used to close away printed content.
    pub morph_kernel_size: u32,

    /// Number of dilations (then the same number of erosions) in the
    /// closing.
    pub morph_iterations: u32,

    /// Side of the Gaussian kernel applied before Canny. Must be odd.
    pub gaussian_blur_kernel_size: u32,

    /// Gaussian sigma. Zero derives sigma from the kernel size.
    pub gaussian_blur_sigma_x: f64,

    /// Canny hysteresis low threshold. Weak edges between the two
    /// thresholds survive only when connected to a strong edge.
    pub canny_lower_hysteresis_threshold: f32,

    /// Canny hysteresis high threshold.
    pub canny_upper_hysteresis_threshold: f32,

    /// Side of the ellipse used to thicken overlay strokes.
    pub edge_dilate_kernel_size: u32,

    /// How many of the largest contours are considered (and, for the
    /// contour debug stage, drawn).
    pub contour_selection_count: usize,

    /// Overlay stroke color.
    pub contour_color: Color,

    /// Overlay stroke width in working-resolution pixels.
    pub contour_thickness: u32,
}

impl PipelineConfig {
    /// Default output stage (the production overlay).
    pub const DEFAULT_OUTPUT_STAGE: DebugStage = DebugStage::CornersDetected;
    /// Default working-resolution cap.
    pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 1080;
    /// Default closing element side.
    pub const DEFAULT_MORPH_KERNEL_SIZE: u32 = 10;
    /// Default closing iterations.
    pub const DEFAULT_MORPH_ITERATIONS: u32 = 3;
    /// Default Gaussian kernel side.
    pub const DEFAULT_GAUSSIAN_BLUR_KERNEL_SIZE: u32 = 11;
    /// Default Gaussian sigma (derive from kernel size).
    pub const DEFAULT_GAUSSIAN_BLUR_SIGMA_X: f64 = 0.0;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOWER_HYSTERESIS_THRESHOLD: f32 = 30.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_UPPER_HYSTERESIS_THRESHOLD: f32 = 150.0;
    /// Default overlay dilation element side.
    pub const DEFAULT_EDGE_DILATE_KERNEL_SIZE: u32 = 2;
    /// Default number of candidate contours.
    pub const DEFAULT_CONTOUR_SELECTION_COUNT: usize = 5;
    /// Default overlay color, opaque green.
    pub const DEFAULT_CONTOUR_COLOR: Color = Color::GREEN;
    /// Default overlay stroke width.
    pub const DEFAULT_CONTOUR_THICKNESS: u32 = 2;

    /// Check every field against its allowed range.
    ///
    /// Nothing is clamped: an out-of-range value is reported, not fixed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfiguration`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_image_height == 0 {
            return Err(invalid("max_image_height must be positive"));
        }
        check_kernel("morph_kernel_size", self.morph_kernel_size)?;
        check_kernel("gaussian_blur_kernel_size", self.gaussian_blur_kernel_size)?;
        if self.gaussian_blur_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "gaussian_blur_kernel_size must be odd, got {}",
                self.gaussian_blur_kernel_size
            )));
        }
        check_kernel("edge_dilate_kernel_size", self.edge_dilate_kernel_size)?;
        if self.morph_iterations == 0 {
            return Err(invalid("morph_iterations must be positive"));
        }
        if !self.gaussian_blur_sigma_x.is_finite() || self.gaussian_blur_sigma_x < 0.0 {
            return Err(invalid(format!(
                "gaussian_blur_sigma_x must be finite and non-negative, got {}",
                self.gaussian_blur_sigma_x
            )));
        }

        let low = self.canny_lower_hysteresis_threshold;
        let high = self.canny_upper_hysteresis_threshold;
        for (name, value) in [
            ("canny_lower_hysteresis_threshold", low),
            ("canny_upper_hysteresis_threshold", high),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if low > high {
            return Err(invalid(format!(
                "canny_lower_hysteresis_threshold ({low}) exceeds canny_upper_hysteresis_threshold ({high})"
            )));
        }

        if self.contour_selection_count == 0 {
            return Err(invalid("contour_selection_count must be positive"));
        }
        if self.contour_thickness == 0 {
            return Err(invalid("contour_thickness must be positive"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_stage: Self::DEFAULT_OUTPUT_STAGE,
            max_image_height: Self::DEFAULT_MAX_IMAGE_HEIGHT,
            morph_kernel_size: Self::DEFAULT_MORPH_KERNEL_SIZE,
            morph_iterations: Self::DEFAULT_MORPH_ITERATIONS,
            gaussian_blur_kernel_size: Self::DEFAULT_GAUSSIAN_BLUR_KERNEL_SIZE,
            gaussian_blur_sigma_x: Self::DEFAULT_GAUSSIAN_BLUR_SIGMA_X,
            canny_lower_hysteresis_threshold: Self::DEFAULT_CANNY_LOWER_HYSTERESIS_THRESHOLD,
            canny_upper_hysteresis_threshold: Self::DEFAULT_CANNY_UPPER_HYSTERESIS_THRESHOLD,
            edge_dilate_kernel_size: Self::DEFAULT_EDGE_DILATE_KERNEL_SIZE,
            contour_selection_count: Self::DEFAULT_CONTOUR_SELECTION_COUNT,
            contour_color: Self::DEFAULT_CONTOUR_COLOR,
            contour_thickness: Self::DEFAULT_CONTOUR_THICKNESS,
        }
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfiguration(message.into())
}

fn check_kernel(name: &str, size: u32) -> Result<(), PipelineError> {
    if size == 0 || size > MAX_ELEMENT_SIZE {
        return Err(invalid(format!(
            "{name} must be in 1..={MAX_ELEMENT_SIZE}, got {size}"
        )));
    }
    Ok(())
}
