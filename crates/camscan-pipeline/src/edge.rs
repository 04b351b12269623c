//! Edge extraction: Gaussian smoothing followed by Canny.
//!
//! Returns a binary image where white pixels (255) are edges and black
//! pixels (0) are background. The input is expected to have already been
//! through content suppression, so the strongest remaining edges are the
//! document's silhouette against the background.

use image::GrayImage;

use crate::blur::gaussian_blur;
use crate::canny::canny;

/// Blur `image` with a `kernel_size` x `kernel_size` Gaussian of the given
/// sigma, then run Canny with the two hysteresis thresholds.
///
/// Pixels with gradient magnitude at or above `high_threshold` are
/// definite edges; those between the thresholds are kept only when
/// connected to a definite edge. Callers validate that `kernel_size` is
/// odd and `low_threshold <= high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn extract_edges(
    image: &GrayImage,
    kernel_size: u32,
    sigma: f64,
    low_threshold: f32,
    high_threshold: f32,
) -> GrayImage {
    let blurred = gaussian_blur(image, kernel_size, sigma);
    canny(&blurred, low_threshold, high_threshold)
}

/// Number of edge (non-zero) pixels in a binary edge map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] > 0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 40x40 image: a bright 20x20 square on a dark background.
    fn bright_square() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                image::Luma([220])
            } else {
                image::Luma([30])
            }
        })
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = GrayImage::from_fn(20, 20, |_, _| image::Luma([128]));
        let edges = extract_edges(&img, 5, 0.0, 30.0, 150.0);
        assert_eq!(edges.dimensions(), (20, 20));
        assert_eq!(count_edge_pixels(&edges), 0);
    }

    #[test]
    fn square_outline_is_found() {
        let edges = extract_edges(&bright_square(), 5, 0.0, 30.0, 150.0);
        assert!(count_edge_pixels(&edges) > 0);
        // Edges hug the square's boundary, nothing in the middle or corners.
        assert_eq!(edges.get_pixel(20, 20).0[0], 0);
        assert_eq!(edges.get_pixel(2, 2).0[0], 0);
        let near_left = (8..=11).any(|x| edges.get_pixel(x, 20).0[0] == 255);
        assert!(near_left, "no edge near the left side of the square");
    }

    #[test]
    fn edge_map_is_binary() {
        let edges = extract_edges(&bright_square(), 11, 0.0, 30.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn higher_thresholds_find_fewer_edges() {
        let img = GrayImage::from_fn(40, 40, |x, y| image::Luma([u8::try_from((x * 5 + y * 3) % 256).unwrap_or(0)]));
        let loose = count_edge_pixels(&extract_edges(&img, 3, 0.0, 5.0, 10.0));
        let strict = count_edge_pixels(&extract_edges(&img, 3, 0.0, 400.0, 800.0));
        assert!(strict <= loose);
    }

    #[test]
    fn count_edge_pixels_counts_non_zero() {
        let mut img = GrayImage::new(4, 4);
        img.put_pixel(0, 0, image::Luma([255]));
        img.put_pixel(3, 2, image::Luma([255]));
        assert_eq!(count_edge_pixels(&img), 2);
    }
}
