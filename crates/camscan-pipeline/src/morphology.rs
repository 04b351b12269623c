//! Morphological filtering: content suppression and overlay thickening.
//!
//! Wraps [`imageproc::morphology`] greyscale dilation and erosion with
//! the two structuring elements the pipeline needs:
//!
//! - a filled square for [`close`], which erases printed text and logos
//!   inside the document so its outer silhouette dominates the edge map;
//! - an ellipse for [`dilate_rgba`], which thickens the rendered overlay
//!   strokes for display. That dilation never feeds back into detection.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::types::PipelineError;

/// Largest supported structuring element side, in pixels.
pub const MAX_ELEMENT_SIZE: u32 = 255;

/// A square structuring element of side `size`, anchored at
/// `(size / 2, size / 2)`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfiguration`] if `size` is zero or
/// larger than [`MAX_ELEMENT_SIZE`].
pub fn rect_element(size: u32) -> Result<Mask, PipelineError> {
    let anchor = element_anchor(size)?;
    let shape = GrayImage::from_pixel(size, size, Luma([255]));
    Ok(Mask::from_image(&shape, anchor, anchor))
}

/// An elliptical structuring element inscribed in a `size` x `size`
/// box, anchored at `(size / 2, size / 2)`.
///
/// Row `i` spans `center ± round(center * sqrt(1 - dy² / r²))` where
/// `dy = i - r` and `r = size / 2`, so even sizes come out slightly
/// lopsided toward the bottom-right, and a side of 1 or 2 degenerates to
/// a point or a small cross.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfiguration`] if `size` is zero or
/// larger than [`MAX_ELEMENT_SIZE`].
pub fn ellipse_element(size: u32) -> Result<Mask, PipelineError> {
    let anchor = element_anchor(size)?;
    Ok(Mask::from_image(&ellipse_shape(size), anchor, anchor))
}

fn element_anchor(size: u32) -> Result<u8, PipelineError> {
    if size == 0 || size > MAX_ELEMENT_SIZE {
        return Err(PipelineError::InvalidConfiguration(format!(
            "structuring element size must be in 1..={MAX_ELEMENT_SIZE}, got {size}"
        )));
    }
    u8::try_from(size / 2).map_err(|_| {
        PipelineError::InvalidConfiguration(format!("structuring element size {size} too large"))
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn ellipse_shape(size: u32) -> GrayImage {
    let radius = i64::from(size / 2);
    let center = f64::from(size / 2);
    let mut shape = GrayImage::new(size, size);
    if radius == 0 {
        shape.put_pixel(0, 0, Luma([255]));
        return shape;
    }
    let inv_r2 = 1.0 / (radius * radius) as f64;
    for row in 0..size {
        let dy = i64::from(row) - radius;
        if dy.abs() > radius {
            continue;
        }
        let dx = (center * (((radius * radius - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
        let start = (radius - dx).max(0);
        let end = (radius + dx + 1).min(i64::from(size));
        for col in start..end {
            shape.put_pixel(col as u32, row, Luma([255]));
        }
    }
    shape
}

/// Morphological closing repeated `iterations` times: `iterations`
/// dilations followed by `iterations` erosions with `element`.
///
/// Merges nearby bright regions and fills dark gaps narrower than the
/// element, which is what wipes printed content off a bright page.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, element: &Mask, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, element);
    }
    for _ in 0..iterations {
        out = grayscale_erode(&out, element);
    }
    out
}

/// Dilate each channel of an RGBA image independently.
///
/// `imageproc` only dilates `GrayImage`, so the image is split into four
/// single-channel images, each is dilated, and the result reassembled.
/// On a transparent canvas carrying opaque strokes this thickens the
/// strokes and leaves the background transparent.
#[must_use = "returns the dilated RGBA image"]
pub fn dilate_rgba(image: &RgbaImage, element: &Mask) -> RgbaImage {
    let (w, h) = image.dimensions();

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]]))
    });

    let dilated: [GrayImage; 4] = std::array::from_fn(|c| grayscale_dilate(&channels[c], element));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            dilated[0].get_pixel(x, y).0[0],
            dilated[1].get_pixel(x, y).0[0],
            dilated[2].get_pixel(x, y).0[0],
            dilated[3].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lit(shape: &GrayImage) -> Vec<(u32, u32)> {
        shape
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] != 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn zero_size_element_rejected() {
        assert!(matches!(
            rect_element(0),
            Err(PipelineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ellipse_element(0),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn oversized_element_rejected() {
        assert!(rect_element(MAX_ELEMENT_SIZE + 1).is_err());
        assert!(rect_element(MAX_ELEMENT_SIZE).is_ok());
    }

    #[test]
    fn ellipse_of_two_is_a_corner_cross() {
        assert_eq!(lit(&ellipse_shape(2)), vec![(1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn ellipse_of_one_is_a_point() {
        assert_eq!(lit(&ellipse_shape(1)), vec![(0, 0)]);
    }

    #[test]
    fn ellipse_of_five_is_rounded() {
        let shape = ellipse_shape(5);
        // Corners are cut, the centre row is full.
        assert_eq!(shape.get_pixel(0, 0).0[0], 0);
        assert_eq!(shape.get_pixel(4, 4).0[0], 0);
        assert!((0..5).all(|x| shape.get_pixel(x, 2).0[0] == 255));
        assert!((0..5).all(|y| shape.get_pixel(2, y).0[0] == 255));
    }

    #[test]
    fn closing_removes_thin_dark_text() {
        // Bright page with a dark 2-pixel-wide stroke across the middle.
        let img = GrayImage::from_fn(40, 40, |x, _| {
            if (19..21).contains(&x) {
                Luma([20])
            } else {
                Luma([220])
            }
        });
        let element = rect_element(5).unwrap();
        let closed = close(&img, &element, 1);
        for y in 5..35 {
            assert_eq!(closed.get_pixel(20, y).0[0], 220, "stroke survived at y={y}");
        }
    }

    #[test]
    fn closing_preserves_bright_rectangle_area() {
        let img = GrayImage::from_fn(60, 60, |x, y| {
            if (15..45).contains(&x) && (20..40).contains(&y) {
                Luma([230])
            } else {
                Luma([25])
            }
        });
        let element = rect_element(5).unwrap();
        let closed = close(&img, &element, 2);
        let bright = closed.pixels().filter(|p| p.0[0] == 230).count();
        assert_eq!(bright, 30 * 20);
    }

    #[test]
    fn zero_iterations_is_identity() {
        let img = GrayImage::from_fn(10, 10, |x, y| Luma([u8::try_from(x * y).unwrap_or(0)]));
        let element = rect_element(3).unwrap();
        assert_eq!(close(&img, &element, 0), img);
    }

    #[test]
    fn dilate_rgba_thickens_stroke_only() {
        let mut canvas = RgbaImage::new(11, 11);
        canvas.put_pixel(5, 5, image::Rgba([0, 255, 0, 255]));
        let element = rect_element(3).unwrap();
        let out = dilate_rgba(&canvas, &element);
        for y in 4..=6 {
            for x in 4..=6 {
                assert_eq!(out.get_pixel(x, y).0, [0, 255, 0, 255]);
            }
        }
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(out.get_pixel(8, 5).0, [0, 0, 0, 0]);
    }
}
