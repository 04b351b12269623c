//! Overlay compositing: outlines on a transparent canvas, scaled to the
//! output resolution.
//!
//! Shapes are stroked at working resolution with `tiny-skia`, thickened
//! by an elliptical dilation, then linearly upscaled to the oriented
//! input size. Everything outside the strokes stays fully transparent so
//! the overlay can be drawn straight over the camera preview.

use image::{Rgba, RgbaImage};
use imageproc::morphology::Mask;
use tiny_skia::{BlendMode, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::morphology::{dilate_rgba, ellipse_element};
use crate::resample::upscale_linear;
use crate::types::{Color, Dimensions, PipelineError, Point};

/// Reusable drawing surface for one working resolution.
pub struct Compositor {
    canvas: Pixmap,
    overlay: RgbaImage,
    dilation: Mask,
    dilate_kernel_size: u32,
    paint: Paint<'static>,
    stroke: Stroke,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .field("dilate_kernel_size", &self.dilate_kernel_size)
            .field("stroke_width", &self.stroke.width)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    /// A compositor drawing `color` strokes `thickness` pixels wide on a
    /// `working`-sized canvas, thickened by a `dilate_kernel_size`
    /// ellipse.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if the canvas cannot
    /// be allocated and [`PipelineError::InvalidConfiguration`] for a bad
    /// dilation size.
    pub fn new(
        working: Dimensions,
        color: Color,
        thickness: u32,
        dilate_kernel_size: u32,
    ) -> Result<Self, PipelineError> {
        let canvas = Pixmap::new(working.width, working.height).ok_or(
            PipelineError::InvalidDimensions {
                width: working.width,
                height: working.height,
            },
        )?;
        let dilation = ellipse_element(dilate_kernel_size)?;

        let mut paint = Paint::default();
        let [r, g, b, a] = color.channels();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = false;
        // Overlapping strokes replace rather than accumulate alpha.
        paint.blend_mode = BlendMode::Source;

        #[allow(clippy::cast_precision_loss)]
        let stroke = Stroke {
            width: thickness as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        Ok(Self {
            canvas,
            overlay: RgbaImage::new(working.width, working.height),
            dilation,
            dilate_kernel_size,
            paint,
            stroke,
        })
    }

    /// Draw each shape as a closed outline and return the overlay at
    /// `output` resolution.
    ///
    /// Shapes are in working coordinates. A single-point shape becomes a
    /// dot; empty shapes are skipped.
    #[must_use = "returns the rendered overlay"]
    pub fn render<'a, I>(&mut self, shapes: I, output: Dimensions) -> RgbaImage
    where
        I: IntoIterator<Item = &'a [Point]>,
    {
        self.canvas.fill(tiny_skia::Color::TRANSPARENT);
        for shape in shapes {
            self.draw_closed(shape);
        }
        self.copy_canvas();
        let thickened = dilate_rgba(&self.overlay, &self.dilation);
        upscale_linear(&thickened, output.width, output.height)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_closed(&mut self, shape: &[Point]) {
        // Pixel (x, y) covers [x, x+1); strokes run through pixel centres.
        let at = |p: Point| ((p.x + 0.5) as f32, (p.y + 0.5) as f32);
        match shape {
            [] => {}
            [only] => {
                let (x, y) = at(*only);
                let radius = (self.stroke.width / 2.0).max(0.5);
                if let Some(dot) = PathBuilder::from_circle(x, y, radius) {
                    self.canvas.fill_path(
                        &dot,
                        &self.paint,
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            [first, rest @ ..] => {
                let mut pb = PathBuilder::new();
                let (x, y) = at(*first);
                pb.move_to(x, y);
                for p in rest {
                    let (x, y) = at(*p);
                    pb.line_to(x, y);
                }
                pb.close();
                if let Some(path) = pb.finish() {
                    self.canvas.stroke_path(
                        &path,
                        &self.paint,
                        &self.stroke,
                        Transform::identity(),
                        None,
                    );
                }
            }
        }
    }

    /// Copy the premultiplied canvas into the straight-alpha overlay.
    fn copy_canvas(&mut self) {
        for (dst, src) in self.overlay.pixels_mut().zip(self.canvas.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
    }
}
