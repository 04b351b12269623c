//! Frame diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every [`Pipeline::process`](crate::Pipeline::process) call collects
//! diagnostics alongside the rendered output. Stages skipped because an
//! earlier debug stage was requested have `None` entries.
//!
//! Timestamps come from a caller-supplied [`Clock`] so the library never
//! reads a platform timer on its own; [`SystemClock`] is the native
//! `std::time::Instant` implementation used by default.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::Contour;

/// A monotonic time source for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from processing a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Frame adapter: luminance copy, rotation, downscale.
    pub adapt: StageDiagnostics,
    /// Content suppression (morphological closing).
    pub suppress: Option<StageDiagnostics>,
    /// Blur and Canny.
    pub edges: Option<StageDiagnostics>,
    /// Contour tracing, ranking and quadrilateral search.
    pub select: Option<StageDiagnostics>,
    /// Overlay drawing, dilation and upscale.
    pub compose: Option<StageDiagnostics>,
    /// Total wall-clock duration for the frame (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: FrameSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Frame adapter metrics.
    Adapt {
        /// Raw sensor width.
        frame_width: u32,
        /// Raw sensor height.
        frame_height: u32,
        /// Working width after rotation and downscale.
        working_width: u32,
        /// Working height after rotation and downscale.
        working_height: u32,
        /// Whether the frame was rotated 90° clockwise.
        rotated: bool,
        /// Whether the frame was downscaled.
        scaled: bool,
    },
    /// Content suppression metrics.
    Suppress {
        /// Square structuring element side.
        kernel_size: u32,
        /// Closing iterations.
        iterations: u32,
    },
    /// Edge extraction metrics.
    Edges {
        /// Gaussian kernel side.
        kernel_size: u32,
        /// Sigma actually used (derived when configured as zero).
        sigma: f64,
        /// Lower hysteresis threshold.
        low_threshold: f32,
        /// Upper hysteresis threshold.
        high_threshold: f32,
        /// Number of edge pixels in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Contour selection metrics.
    Select {
        /// Number of contours traced.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Points in the largest contour.
        max_contour_points: usize,
        /// Area of the largest contour, in working pixels.
        largest_area: f64,
        /// Whether a four-cornered outline was found.
        corners_found: bool,
    },
    /// Compositor metrics.
    Compose {
        /// Number of outlines drawn.
        shapes_drawn: usize,
        /// Cosmetic dilation element side.
        dilate_kernel_size: u32,
        /// Rendered overlay width.
        output_width: u32,
        /// Rendered overlay height.
        output_height: u32,
    },
}

/// High-level summary for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Working resolution width.
    pub working_width: u32,
    /// Working resolution height.
    pub working_height: u32,
    /// Number of contours traced (0 when selection did not run).
    pub contour_count: usize,
    /// Whether a document outline was found.
    pub corners_found: bool,
}

impl FrameDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Frame Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Working resolution: {}x{}",
            self.summary.working_width, self.summary.working_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![("Adapt", &self.adapt)];
        let optional = [
            ("Suppress", &self.suppress),
            ("Edges", &self.edges),
            ("Select", &self.select),
            ("Compose", &self.compose),
        ];
        for (name, diag) in optional {
            if let Some(diag) = diag {
                stages.push((name, diag));
            }
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Document: {}",
            self.summary.contour_count,
            if self.summary.corners_found {
                "found"
            } else {
                "none"
            },
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Adapt {
            frame_width,
            frame_height,
            working_width,
            working_height,
            rotated,
            scaled,
        } => {
            let mut notes = Vec::new();
            if *rotated {
                notes.push("rotated");
            }
            if *scaled {
                notes.push("scaled");
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            };
            format!("{frame_width}x{frame_height} -> {working_width}x{working_height}{notes}")
        }
        StageMetrics::Suppress {
            kernel_size,
            iterations,
        } => format!("kernel={kernel_size} iterations={iterations}"),
        StageMetrics::Edges {
            kernel_size,
            sigma,
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "kernel={kernel_size} sigma={sigma:.2} low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::Select {
            contour_count,
            total_point_count,
            max_contour_points,
            largest_area,
            corners_found,
        } => {
            format!(
                "{contour_count} contours, {total_point_count} pts (max={max_contour_points}) largest={largest_area:.0}px² quad={corners_found}",
            )
        }
        StageMetrics::Compose {
            shapes_drawn,
            dilate_kernel_size,
            output_width,
            output_height,
        } => {
            format!(
                "{shapes_drawn} shapes, dilate={dilate_kernel_size} -> {output_width}x{output_height}",
            )
        }
    }
}

/// Selection metrics for a ranked contour list.
pub(crate) fn select_metrics(ranked: &[Contour], corners_found: bool) -> StageMetrics {
    StageMetrics::Select {
        contour_count: ranked.len(),
        total_point_count: ranked.iter().map(Contour::len).sum(),
        max_contour_points: ranked.iter().map(Contour::len).max().unwrap_or(0),
        largest_area: ranked.first().map_or(0.0, Contour::area),
        corners_found,
    }
}
