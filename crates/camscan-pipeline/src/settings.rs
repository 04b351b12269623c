//! Keyed text settings, as a preferences store holds them.
//!
//! User-entered values are lenient: they are trimmed, and anything that
//! fails to parse silently becomes that field's default. Range checks are
//! left to [`PipelineConfig::validate`], so a parsable but out-of-range
//! value still fails when the pipeline is built.

use crate::config::PipelineConfig;
use crate::types::{Color, DebugStage};

/// Setting keys, one per [`PipelineConfig`] field.
pub mod keys {
    /// Debug stage, as a numeric code (0..=4) or a stage name.
    pub const OUTPUT_STAGE: &str = "image_processor.output_stage";
    /// Working-resolution cap.
    pub const MAX_IMAGE_HEIGHT: &str = "image_processor.max_image_height";
    /// Closing element side.
    pub const MORPH_KERNEL_SIZE: &str = "image_processor.morph_kernel_size";
    /// Closing iterations.
    pub const MORPH_ITERATIONS: &str = "image_processor.morph_iterations";
    /// Gaussian sigma.
    pub const GAUSSIAN_BLUR_SIGMA_X: &str = "image_processor.gaussian_blur_sigma_x";
    /// Gaussian kernel side.
    pub const GAUSSIAN_BLUR_KERNEL_SIZE: &str = "image_processor.gaussian_blur_kernel_size";
    /// Overlay dilation element side.
    pub const EDGE_DILATE_KERNEL_SIZE: &str = "image_processor.edge_dilate_kernel_size";
    /// Canny low threshold.
    pub const CANNY_LOWER_HYSTERESIS_THRESHOLD: &str =
        "image_processor.canny_lower_hysteresis_threshold";
    /// Canny high threshold.
    pub const CANNY_UPPER_HYSTERESIS_THRESHOLD: &str =
        "image_processor.canny_upper_hysteresis_threshold";
    /// Candidate contour count.
    pub const CONTOUR_SELECTION_COUNT: &str = "image_processor.contour_selection_count";
    /// Overlay color.
    pub const CONTOUR_COLOR: &str = "image_processor.contour_color";
    /// Overlay stroke width.
    pub const CONTOUR_THICKNESS: &str = "image_processor.contour_thickness";

    /// Every key, in display order.
    pub const ALL: [&str; 12] = [
        OUTPUT_STAGE,
        MAX_IMAGE_HEIGHT,
        MORPH_KERNEL_SIZE,
        MORPH_ITERATIONS,
        GAUSSIAN_BLUR_SIGMA_X,
        GAUSSIAN_BLUR_KERNEL_SIZE,
        EDGE_DILATE_KERNEL_SIZE,
        CANNY_LOWER_HYSTERESIS_THRESHOLD,
        CANNY_UPPER_HYSTERESIS_THRESHOLD,
        CONTOUR_SELECTION_COUNT,
        CONTOUR_COLOR,
        CONTOUR_THICKNESS,
    ];
}

/// Errors from applying keyed settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The key names no configuration field.
    #[error("unknown setting key: {0:?}")]
    UnknownKey(String),

    /// A `key=value` pair without the `=`.
    #[error("malformed setting {0:?}, expected key=value")]
    Malformed(String),
}

/// Apply one setting to `config`.
///
/// # Errors
///
/// Returns [`SettingsError::UnknownKey`] if `key` is not one of
/// [`keys::ALL`]. Unparsable values never fail; they reset the field to
/// its default.
pub fn apply_setting(
    config: &mut PipelineConfig,
    key: &str,
    value: &str,
) -> Result<(), SettingsError> {
    let value = value.trim();
    match key.trim() {
        keys::OUTPUT_STAGE => {
            config.output_stage =
                parse_stage(value).unwrap_or(PipelineConfig::DEFAULT_OUTPUT_STAGE);
        }
        keys::MAX_IMAGE_HEIGHT => {
            config.max_image_height =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_MAX_IMAGE_HEIGHT);
        }
        keys::MORPH_KERNEL_SIZE => {
            config.morph_kernel_size =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_MORPH_KERNEL_SIZE);
        }
        keys::MORPH_ITERATIONS => {
            config.morph_iterations =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_MORPH_ITERATIONS);
        }
        keys::GAUSSIAN_BLUR_SIGMA_X => {
            config.gaussian_blur_sigma_x =
                parse_real(value).unwrap_or(PipelineConfig::DEFAULT_GAUSSIAN_BLUR_SIGMA_X);
        }
        keys::GAUSSIAN_BLUR_KERNEL_SIZE => {
            config.gaussian_blur_kernel_size =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_GAUSSIAN_BLUR_KERNEL_SIZE);
        }
        keys::EDGE_DILATE_KERNEL_SIZE => {
            config.edge_dilate_kernel_size =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_EDGE_DILATE_KERNEL_SIZE);
        }
        keys::CANNY_LOWER_HYSTERESIS_THRESHOLD => {
            config.canny_lower_hysteresis_threshold = parse_threshold(value)
                .unwrap_or(PipelineConfig::DEFAULT_CANNY_LOWER_HYSTERESIS_THRESHOLD);
        }
        keys::CANNY_UPPER_HYSTERESIS_THRESHOLD => {
            config.canny_upper_hysteresis_threshold = parse_threshold(value)
                .unwrap_or(PipelineConfig::DEFAULT_CANNY_UPPER_HYSTERESIS_THRESHOLD);
        }
        keys::CONTOUR_SELECTION_COUNT => {
            config.contour_selection_count = parse_count(value)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(PipelineConfig::DEFAULT_CONTOUR_SELECTION_COUNT);
        }
        keys::CONTOUR_COLOR => {
            config.contour_color =
                Color::parse(value).unwrap_or(PipelineConfig::DEFAULT_CONTOUR_COLOR);
        }
        keys::CONTOUR_THICKNESS => {
            config.contour_thickness =
                parse_count(value).unwrap_or(PipelineConfig::DEFAULT_CONTOUR_THICKNESS);
        }
        other => return Err(SettingsError::UnknownKey(other.to_string())),
    }
    Ok(())
}

/// Build a configuration from defaults plus `(key, value)` settings,
/// applied in order.
///
/// # Errors
///
/// Returns the first [`SettingsError::UnknownKey`].
pub fn config_from_settings<'a, I>(settings: I) -> Result<PipelineConfig, SettingsError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut config = PipelineConfig::default();
    for (key, value) in settings {
        apply_setting(&mut config, key, value)?;
    }
    Ok(config)
}

/// Split a `key=value` pair at the first `=`.
///
/// # Errors
///
/// Returns [`SettingsError::Malformed`] if there is no `=`.
pub fn split_assignment(text: &str) -> Result<(&str, &str), SettingsError> {
    text.split_once('=')
        .ok_or_else(|| SettingsError::Malformed(text.to_string()))
}

impl PipelineConfig {
    /// Render every field as a `(key, value)` setting.
    ///
    /// Feeding the result back through [`config_from_settings`] yields an
    /// equal configuration.
    #[must_use]
    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::OUTPUT_STAGE, self.output_stage.code().to_string()),
            (keys::MAX_IMAGE_HEIGHT, self.max_image_height.to_string()),
            (keys::MORPH_KERNEL_SIZE, self.morph_kernel_size.to_string()),
            (keys::MORPH_ITERATIONS, self.morph_iterations.to_string()),
            (
                keys::GAUSSIAN_BLUR_SIGMA_X,
                self.gaussian_blur_sigma_x.to_string(),
            ),
            (
                keys::GAUSSIAN_BLUR_KERNEL_SIZE,
                self.gaussian_blur_kernel_size.to_string(),
            ),
            (
                keys::EDGE_DILATE_KERNEL_SIZE,
                self.edge_dilate_kernel_size.to_string(),
            ),
            (
                keys::CANNY_LOWER_HYSTERESIS_THRESHOLD,
                self.canny_lower_hysteresis_threshold.to_string(),
            ),
            (
                keys::CANNY_UPPER_HYSTERESIS_THRESHOLD,
                self.canny_upper_hysteresis_threshold.to_string(),
            ),
            (
                keys::CONTOUR_SELECTION_COUNT,
                self.contour_selection_count.to_string(),
            ),
            (keys::CONTOUR_COLOR, self.contour_color.to_string()),
            (keys::CONTOUR_THICKNESS, self.contour_thickness.to_string()),
        ]
    }
}

/// A stage code (`"3"`) or name (`"contours_detected"`).
fn parse_stage(value: &str) -> Option<DebugStage> {
    match value.parse::<u8>() {
        Ok(code) => DebugStage::try_from(code).ok(),
        Err(_) => value.parse().ok(),
    }
}

/// A non-negative integer, also accepted in decimal form (`"10.0"`),
/// which is truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_count(value: &str) -> Option<u32> {
    if let Ok(n) = value.parse::<u32>() {
        return Some(n);
    }
    let real = value.parse::<f64>().ok()?;
    (real.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&real)).then(|| real.trunc() as u32)
}

fn parse_real(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_threshold(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}
