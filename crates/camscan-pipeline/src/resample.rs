//! Resampling between the oriented and working resolutions.
//!
//! Downscaling (frame adapter) uses area averaging, which avoids the
//! aliasing a point-sampling filter would introduce on fine print.
//! Upscaling (compositor) uses linear interpolation: the overlay only
//! carries thin strokes, so anything sharper is wasted work.
//!
//! Both functions are no-ops on the pixel data when the source and
//! target sizes already match.

use image::imageops::FilterType;
use image::{GrayImage, RgbaImage};

/// Area-average `src` down to the size of `dst`, overwriting `dst`.
///
/// When the sizes are equal the pixels are copied unchanged. The
/// allocation behind `dst` is kept either way.
pub fn downsample_area(src: &GrayImage, dst: &mut GrayImage) {
    if src.dimensions() == dst.dimensions() {
        dst.copy_from_slice(src);
        return;
    }
    let resized = image::imageops::thumbnail(src, dst.width(), dst.height());
    dst.copy_from_slice(&resized);
}

/// Linearly interpolate `src` up to `width` x `height`.
///
/// Returns a copy of `src` when it already has the requested size.
#[must_use = "returns the resized image"]
pub fn upscale_linear(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    image::imageops::resize(src, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_sizes_copy_unchanged() {
        let src = GrayImage::from_fn(8, 6, |x, y| image::Luma([u8::try_from(x * 6 + y).unwrap_or(0)]));
        let mut dst = GrayImage::new(8, 6);
        downsample_area(&src, &mut dst);
        assert_eq!(src, dst);
    }

    #[test]
    fn downsample_averages_blocks() {
        // 4x4 with a 2x2 checkerboard of 2x2 blocks.
        let src = GrayImage::from_fn(4, 4, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                image::Luma([200])
            } else {
                image::Luma([40])
            }
        });
        let mut dst = GrayImage::new(2, 2);
        downsample_area(&src, &mut dst);
        assert_eq!(dst.get_pixel(0, 0).0[0], 200);
        assert_eq!(dst.get_pixel(1, 0).0[0], 40);
        assert_eq!(dst.get_pixel(0, 1).0[0], 40);
        assert_eq!(dst.get_pixel(1, 1).0[0], 200);
    }

    #[test]
    fn downsample_of_fine_stripes_is_grey() {
        // One-pixel stripes average out rather than aliasing.
        let src = GrayImage::from_fn(40, 40, |x, _| {
            if x % 2 == 0 {
                image::Luma([0])
            } else {
                image::Luma([200])
            }
        });
        let mut dst = GrayImage::new(10, 10);
        downsample_area(&src, &mut dst);
        for p in dst.pixels() {
            assert!((90..=110).contains(&p.0[0]), "got {}", p.0[0]);
        }
    }

    #[test]
    fn upscale_changes_dimensions() {
        let src = RgbaImage::from_pixel(10, 20, image::Rgba([0, 255, 0, 255]));
        let up = upscale_linear(&src, 40, 80);
        assert_eq!(up.dimensions(), (40, 80));
        assert!(up.pixels().all(|p| p.0 == [0, 255, 0, 255]));
    }

    #[test]
    fn upscale_same_size_is_copy() {
        let src = RgbaImage::from_fn(5, 5, |x, _| image::Rgba([u8::try_from(x).unwrap_or(0), 0, 0, 255]));
        assert_eq!(upscale_linear(&src, 5, 5), src);
    }

    #[test]
    fn upscale_keeps_transparent_background() {
        let mut src = RgbaImage::new(10, 10);
        src.put_pixel(5, 5, image::Rgba([255, 0, 0, 255]));
        let up = upscale_linear(&src, 40, 40);
        assert_eq!(up.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert!(up.get_pixel(22, 22).0[3] > 0);
    }
}
