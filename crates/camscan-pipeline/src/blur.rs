//! Gaussian blur for noise reduction before edge detection.
//!
//! Unlike [`imageproc::filter::gaussian_blur_f32`], which derives the
//! kernel extent from sigma, this blur takes an explicit odd kernel size
//! so the smoothing window stays fixed while sigma is tuned. A sigma of
//! zero derives sigma from the kernel size instead.

use image::GrayImage;
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

/// Sigma implied by an odd kernel `size` when none is given.
///
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`, which gives 2.0 for the
/// default 11-pixel kernel.
#[must_use]
pub fn sigma_for_kernel_size(size: u32) -> f64 {
    0.3f64.mul_add((f64::from(size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Sigma actually used for a `(size, sigma)` pair.
#[must_use]
pub fn effective_sigma(size: u32, sigma: f64) -> f64 {
    if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel_size(size)
    }
}

/// Normalized 1-D Gaussian weights for an odd kernel `size`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian_weights(size: u32, sigma: f64) -> Vec<f32> {
    let sigma = effective_sigma(size, sigma);
    let half = f64::from(size / 2);
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = f64::from(i) - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / total) as f32).collect()
}

/// Apply a `size` x `size` Gaussian blur with the given sigma.
///
/// A kernel size of 1 returns the image unchanged. Pixels beyond the
/// border are clamped to the nearest edge pixel.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, size: u32, sigma: f64) -> GrayImage {
    if size <= 1 {
        return image.clone();
    }

    let row = gaussian_weights(size, sigma);
    // Outer product of the 1-D weights; the 2-D kernel sums to one.
    let weights: Vec<f32> = row
        .iter()
        .flat_map(|&wy| row.iter().map(move |&wx| wx * wy))
        .collect();
    filter_clamped(image, Kernel::new(&weights, size, size))
}
