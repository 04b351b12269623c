//! Canny edge detection on an already-smoothed image.
//!
//! Derived from `imageproc 0.26.0`'s `edges::{canny, non_maximum_suppression,
//! hysteresis}` with these changes:
//!
//! 1. **No internal blur.** `imageproc::edges::canny` always applies a
//!    fixed sigma=1.4 Gaussian first. The edge extractor runs its own
//!    configurable blur, so smoothing twice would silently shift the
//!    tuned thresholds.
//!
//! 2. **L1 gradient magnitude** (`|gx| + |gy|`) instead of `hypot`, so
//!    hysteresis thresholds keep the scale camera-scanner tunings expect
//!    (30/150 on 8-bit input).
//!
//! 3. **Border-safe hysteresis** tracking all 8 neighbours. Upstream
//!    underflows `nx - 1` at `x = 0` and skips the north and north-east
//!    neighbours (<https://github.com/image-rs/imageproc/issues/705>,
//!    <https://github.com/image-rs/imageproc/pull/746>).

use std::f32::consts::PI;

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Detect edges in a smoothed greyscale image.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. Border
/// pixels are never edges. `low_threshold` must not exceed
/// `high_threshold`; callers validate this up front.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    debug_assert!(high_threshold >= low_threshold);

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Image<Luma<f32>> = Image::from_fn(image.width(), image.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.abs() + v.abs()])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Keep only pixels that are local maxima along the gradient direction.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    const RADIANS_TO_DEGREES: f32 = 180.0 / PI;
    let (width, height) = g.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0]));
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let x_gradient = f32::from(gx.get_pixel(x, y).0[0]);
            let y_gradient = f32::from(gy.get_pixel(x, y).0[0]);
            let mut angle = y_gradient.atan2(x_gradient) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            // Neighbours across the edge, by gradient direction quantized
            // to 0/45/90/135 degrees.
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                ((x - 1, y), (x + 1, y))
            } else if angle < 67.5 {
                ((x + 1, y + 1), (x - 1, y - 1))
            } else if angle < 112.5 {
                ((x, y - 1), (x, y + 1))
            } else {
                ((x - 1, y + 1), (x + 1, y - 1))
            };

            let pixel = g.get_pixel(x, y).0[0];
            let cmp1 = g.get_pixel(a.0, a.1).0[0];
            let cmp2 = g.get_pixel(b.0, b.1).0[0];
            if pixel >= cmp1 && pixel >= cmp2 {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges 8-connected to them.
///
/// Non-recursive depth-first flood from every pixel at or above
/// `high_thresh`, spreading through pixels at or above `low_thresh`.
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (w, h) = input.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            if input.get_pixel(x, y).0[0] < high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));
            while let Some((nx, ny)) = stack.pop() {
                let neighbours = [
                    (nx + 1, ny),
                    (nx + 1, ny + 1),
                    (nx, ny + 1),
                    (nx.wrapping_sub(1), ny.wrapping_sub(1)),
                    (nx.wrapping_sub(1), ny),
                    (nx.wrapping_sub(1), ny + 1),
                    (nx, ny.wrapping_sub(1)),
                    (nx + 1, ny.wrapping_sub(1)),
                ];
                for (px, py) in neighbours {
                    // wrapping_sub turns -1 into u32::MAX, caught here.
                    if px >= w || py >= h {
                        continue;
                    }
                    if input.get_pixel(px, py).0[0] >= low_thresh && out.get_pixel(px, py).0[0] == 0
                    {
                        out.put_pixel(px, py, Luma([255]));
                        stack.push((px, py));
                    }
                }
            }
        }
    }
    out
}
