//! Camera frames and luminance extraction.
//!
//! A [`Frame`] borrows the planes of a planar YUV-family image for the
//! duration of one [`Pipeline::process`](crate::Pipeline::process) call.
//! Only the first plane (luminance) is read; it is already an 8-bit
//! greyscale image, so no color conversion is needed.
//!
//! This is the first half of the frame adapter: luminance bytes in,
//! oriented greyscale buffer out. Downscaling lives in
//! [`resample`](crate::resample).

use image::GrayImage;

use crate::types::{Dimensions, PipelineError};

/// One plane of a planar image.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    data: &'a [u8],
    row_stride: usize,
}

impl<'a> Plane<'a> {
    /// A plane whose rows start every `row_stride` bytes.
    #[must_use]
    pub const fn new(data: &'a [u8], row_stride: usize) -> Self {
        Self { data, row_stride }
    }

    /// The raw plane bytes, including any row padding.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Distance in bytes between the starts of consecutive rows.
    #[must_use]
    pub const fn row_stride(&self) -> usize {
        self.row_stride
    }
}

/// A raw camera frame, borrowed from the frame source.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    planes: Vec<Plane<'a>>,
}

impl<'a> Frame<'a> {
    /// A frame of `width` x `height` sensor pixels made of `planes`.
    ///
    /// The first plane must be luminance; further planes are ignored.
    #[must_use]
    pub const fn new(width: u32, height: u32, planes: Vec<Plane<'a>>) -> Self {
        Self {
            width,
            height,
            planes,
        }
    }

    /// A frame holding only a tightly packed luminance plane.
    #[must_use]
    pub fn from_luma(width: u32, height: u32, luma: &'a [u8]) -> Self {
        Self::new(width, height, vec![Plane::new(luma, width as usize)])
    }

    /// Sensor width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Sensor height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Sensor dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// The luminance plane, checked to cover every row.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidFrame`] if the frame has no
    /// planes, a row stride narrower than the frame, or too few bytes.
    pub fn luminance(&self) -> Result<&Plane<'a>, PipelineError> {
        let plane = self
            .planes
            .first()
            .ok_or_else(|| PipelineError::InvalidFrame("frame has no pixel planes".to_string()))?;

        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidFrame(format!(
                "frame is {}",
                self.dimensions()
            )));
        }
        if plane.row_stride < width {
            return Err(PipelineError::InvalidFrame(format!(
                "row stride {} is narrower than width {width}",
                plane.row_stride
            )));
        }
        let required = plane.row_stride * (height - 1) + width;
        if plane.data.len() < required {
            return Err(PipelineError::InvalidFrame(format!(
                "luminance plane holds {} bytes, {required} required",
                plane.data.len()
            )));
        }
        Ok(plane)
    }
}

/// Copy the luminance plane of `frame` into `oriented`, rotating it 90°
/// clockwise when `rotate` is set.
///
/// `oriented` must already have the oriented dimensions (sensor
/// dimensions swapped when rotating). Its allocation is reused.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidFrame`] if the luminance plane is
/// missing or too small, and [`PipelineError::FrameSizeMismatch`] if
/// `oriented` has the wrong size.
pub fn load_luminance(
    frame: &Frame<'_>,
    rotate: bool,
    oriented: &mut GrayImage,
) -> Result<(), PipelineError> {
    let plane = frame.luminance()?;
    let expected = if rotate {
        Dimensions::new(frame.height, frame.width)
    } else {
        frame.dimensions()
    };
    let actual = Dimensions::new(oriented.width(), oriented.height());
    if actual != expected {
        return Err(PipelineError::FrameSizeMismatch { expected, actual });
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let out: &mut [u8] = oriented;

    let rows = plane.data.chunks(plane.row_stride).take(height);
    if rotate {
        // Clockwise: sensor (x, y) lands at oriented (height - 1 - y, x),
        // and the oriented image is `height` pixels wide.
        for (y, row) in rows.enumerate() {
            let column = height - 1 - y;
            for (x, &value) in row[..width].iter().enumerate() {
                out[x * height + column] = value;
            }
        }
    } else {
        for (row, dst) in rows.zip(out.chunks_exact_mut(width)) {
            dst.copy_from_slice(&row[..width]);
        }
    }
    Ok(())
}
