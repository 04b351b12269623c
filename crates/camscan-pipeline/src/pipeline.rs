//! The per-frame document detection pipeline.
//!
//! A [`Pipeline`] is built once for a camera's frame size and then fed
//! frames one at a time:
//!
//! ```text
//! frame -> adapt -> suppress -> edges -> select -> compose -> overlay
//!            |          |          |
//!            +----------+----------+--> raster taps (debug stages)
//! ```
//!
//! The luminance buffers, the overlay canvas and the structuring
//! elements are allocated up front and reused for every frame. The
//! returned image is always freshly allocated and owned by the caller.

use image::GrayImage;
use imageproc::morphology::Mask;
use tracing::{debug, trace};

use crate::blur::effective_sigma;
use crate::compositor::Compositor;
use crate::config::PipelineConfig;
use crate::contour::Contour;
use crate::diagnostics::{
    Clock, FrameDiagnostics, FrameSummary, StageDiagnostics, StageMetrics, SystemClock,
    select_metrics,
};
use crate::edge::{count_edge_pixels, extract_edges};
use crate::frame::{Frame, load_luminance};
use crate::geometry::Geometry;
use crate::morphology::{close, rect_element};
use crate::resample::downsample_area;
use crate::select::{Selection, select};
use crate::types::{DebugStage, DocumentCorners, FrameOutput, PipelineError, Point, StageImage};

/// Document boundary detector for frames of one fixed size.
pub struct Pipeline {
    config: PipelineConfig,
    geometry: Geometry,
    closing: Mask,
    /// Full-resolution rotated luminance, only needed when downscaling.
    oriented: Option<GrayImage>,
    working: GrayImage,
    compositor: Compositor,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("geometry", &self.geometry)
            .field("compositor", &self.compositor)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline for `input_width` x `input_height` frames.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension
    /// is zero and [`PipelineError::InvalidConfiguration`] if `config`
    /// fails [`PipelineConfig::validate`].
    pub fn new(
        input_width: u32,
        input_height: u32,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let geometry = Geometry::new(input_width, input_height, config.max_image_height)?;
        let closing = rect_element(config.morph_kernel_size)?;
        let compositor = Compositor::new(
            geometry.working,
            config.contour_color,
            config.contour_thickness,
            config.edge_dilate_kernel_size,
        )?;

        let oriented = geometry
            .needs_scaling
            .then(|| GrayImage::new(geometry.oriented.width, geometry.oriented.height));
        let working = GrayImage::new(geometry.working.width, geometry.working.height);

        debug!(
            frame = %geometry.frame,
            oriented = %geometry.oriented,
            working = %geometry.working,
            rotate = geometry.needs_rotation,
            scale = geometry.needs_scaling,
            stage = %config.output_stage,
            "pipeline built"
        );

        Ok(Self {
            config,
            geometry,
            closing,
            oriented,
            working,
            compositor,
        })
    }

    /// The frame, oriented and working sizes this pipeline was built for.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The configuration this pipeline was built with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one frame through the pipeline, timed with [`SystemClock`].
    ///
    /// # Errors
    ///
    /// See [`process_with_clock`](Self::process_with_clock).
    pub fn process(&mut self, frame: &Frame<'_>) -> Result<FrameOutput, PipelineError> {
        self.process_with_clock(frame, &SystemClock)
    }

    /// Run one frame through the pipeline, timing each stage with `clock`.
    ///
    /// Stops after [`PipelineConfig::output_stage`]. Failing to find a
    /// document is not an error: the output then carries no corners and
    /// an empty (fully transparent) overlay.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FrameSizeMismatch`] if the frame is not
    /// the size the pipeline was built for and
    /// [`PipelineError::InvalidFrame`] if its luminance plane is
    /// unreadable.
    pub fn process_with_clock<C: Clock>(
        &mut self,
        frame: &Frame<'_>,
        clock: &C,
    ) -> Result<FrameOutput, PipelineError> {
        let expected = self.geometry.frame;
        let actual = frame.dimensions();
        if actual != expected {
            return Err(PipelineError::FrameSizeMismatch { expected, actual });
        }

        let stage = self.config.output_stage;
        let frame_start = clock.now();
        let mut timer = StageTimer::new(clock);

        self.adapt(frame)?;
        let adapt = timer.lap(StageMetrics::Adapt {
            frame_width: self.geometry.frame.width,
            frame_height: self.geometry.frame.height,
            working_width: self.geometry.working.width,
            working_height: self.geometry.working.height,
            rotated: self.geometry.needs_rotation,
            scaled: self.geometry.needs_scaling,
        });
        trace!(working = %self.geometry.working, "frame adapted");

        let mut report = Report {
            diagnostics: FrameDiagnostics {
                adapt,
                suppress: None,
                edges: None,
                select: None,
                compose: None,
                total_duration: std::time::Duration::ZERO,
                summary: FrameSummary {
                    working_width: self.geometry.working.width,
                    working_height: self.geometry.working.height,
                    contour_count: 0,
                    corners_found: false,
                },
            },
        };

        if stage == DebugStage::Preprocessed {
            let image = self.working.clone();
            return Ok(report.finish(stage, StageImage::Luma(image), None, clock, &frame_start));
        }

        let closed = close(&self.working, &self.closing, self.config.morph_iterations);
        report.diagnostics.suppress = Some(timer.lap(StageMetrics::Suppress {
            kernel_size: self.config.morph_kernel_size,
            iterations: self.config.morph_iterations,
        }));
        trace!(
            kernel = self.config.morph_kernel_size,
            iterations = self.config.morph_iterations,
            "content suppressed"
        );

        if stage == DebugStage::ContentRemoved {
            return Ok(report.finish(stage, StageImage::Luma(closed), None, clock, &frame_start));
        }

        let edges = extract_edges(
            &closed,
            self.config.gaussian_blur_kernel_size,
            self.config.gaussian_blur_sigma_x,
            self.config.canny_lower_hysteresis_threshold,
            self.config.canny_upper_hysteresis_threshold,
        );
        let edge_pixel_count = count_edge_pixels(&edges);
        report.diagnostics.edges = Some(timer.lap(StageMetrics::Edges {
            kernel_size: self.config.gaussian_blur_kernel_size,
            sigma: effective_sigma(
                self.config.gaussian_blur_kernel_size,
                self.config.gaussian_blur_sigma_x,
            ),
            low_threshold: self.config.canny_lower_hysteresis_threshold,
            high_threshold: self.config.canny_upper_hysteresis_threshold,
            edge_pixel_count,
            total_pixel_count: self.geometry.working.pixel_count(),
        }));
        trace!(edge_pixel_count, "edges extracted");

        if stage == DebugStage::EdgesDetected {
            return Ok(report.finish(stage, StageImage::Luma(edges), None, clock, &frame_start));
        }

        let selection = select(&edges, self.config.contour_selection_count);
        report.diagnostics.select = Some(timer.lap(select_metrics(
            &selection.contours,
            selection.corners.is_some(),
        )));
        report.diagnostics.summary.contour_count = selection.contours.len();
        report.diagnostics.summary.corners_found = selection.corners.is_some();
        trace!(contours = selection.contours.len(), "contours traced");
        match &selection.corners {
            Some(corners) => debug!(area = corners.area(), "document corners found"),
            None => debug!("no four-cornered contour among the candidates"),
        }

        let (overlay, shapes_drawn) = self.compose(stage, &selection);
        report.diagnostics.compose = Some(timer.lap(StageMetrics::Compose {
            shapes_drawn,
            dilate_kernel_size: self.config.edge_dilate_kernel_size,
            output_width: overlay.width(),
            output_height: overlay.height(),
        }));

        Ok(report.finish(
            stage,
            StageImage::Rgba(overlay),
            selection.corners,
            clock,
            &frame_start,
        ))
    }

    /// Luminance in, working-resolution greyscale out.
    fn adapt(&mut self, frame: &Frame<'_>) -> Result<(), PipelineError> {
        let rotate = self.geometry.needs_rotation;
        match &mut self.oriented {
            Some(oriented) => {
                load_luminance(frame, rotate, oriented)?;
                downsample_area(oriented, &mut self.working);
            }
            None => load_luminance(frame, rotate, &mut self.working)?,
        }
        Ok(())
    }

    /// Draw the overlay for an overlay stage, returning it with the
    /// number of outlines drawn.
    fn compose(&mut self, stage: DebugStage, selection: &Selection) -> (image::RgbaImage, usize) {
        let output = self.geometry.oriented;
        if stage == DebugStage::ContoursDetected {
            let top = selection.top(self.config.contour_selection_count);
            let overlay = self
                .compositor
                .render(top.iter().map(Contour::points), output);
            (overlay, top.len())
        } else {
            let corners: Option<&[Point]> = selection.corners.as_ref().map(|c| &c.points()[..]);
            let drawn = usize::from(corners.is_some());
            (self.compositor.render(corners, output), drawn)
        }
    }
}

/// Measures consecutive stages against one clock.
struct StageTimer<'c, C: Clock> {
    clock: &'c C,
    start: C::Instant,
}

impl<'c, C: Clock> StageTimer<'c, C> {
    fn new(clock: &'c C) -> Self {
        Self {
            clock,
            start: clock.now(),
        }
    }

    /// Close the current stage with `metrics` and start the next one.
    fn lap(&mut self, metrics: StageMetrics) -> StageDiagnostics {
        let duration = self.clock.elapsed(&self.start);
        self.start = self.clock.now();
        StageDiagnostics { duration, metrics }
    }
}

/// Diagnostics accumulated while a frame is in flight.
struct Report {
    diagnostics: FrameDiagnostics,
}

impl Report {
    fn finish<C: Clock>(
        mut self,
        stage: DebugStage,
        image: StageImage,
        corners: Option<DocumentCorners>,
        clock: &C,
        frame_start: &C::Instant,
    ) -> FrameOutput {
        debug_assert_eq!(stage.is_raster_tap(), matches!(image, StageImage::Luma(_)));
        self.diagnostics.total_duration = clock.elapsed(frame_start);
        FrameOutput {
            stage,
            image,
            corners,
            contour_count: self.diagnostics.summary.contour_count,
            diagnostics: self.diagnostics,
        }
    }
}
