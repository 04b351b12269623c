//! Frame geometry: orientation and working resolution.
//!
//! Derived once when a [`Pipeline`](crate::Pipeline) is built and never
//! changed afterwards. Landscape sensor frames are rotated 90° clockwise
//! so the pipeline always works on a portrait image, and images whose
//! long side exceeds the configured cap are downscaled with the aspect
//! ratio preserved.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Point};

/// Orientation and resolution of the three image spaces the pipeline
/// touches.
///
/// - *frame*: the raw sensor frame as delivered by the camera.
/// - *oriented*: the frame after the optional rotation. Overlay output
///   is sized to this space.
/// - *working*: the oriented frame after the optional downscale. All
///   detection happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Raw sensor frame size.
    pub frame: Dimensions,
    /// Size after rotation (always portrait or square).
    pub oriented: Dimensions,
    /// Size the detection stages operate on.
    pub working: Dimensions,
    /// Whether the frame is rotated 90° clockwise.
    pub needs_rotation: bool,
    /// Whether the oriented frame is downscaled.
    pub needs_scaling: bool,
}

impl Geometry {
    /// Derive the geometry for frames of `input_width` x `input_height`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either input
    /// dimension is zero and [`PipelineError::InvalidConfiguration`] if
    /// `max_image_height` is zero.
    pub fn new(
        input_width: u32,
        input_height: u32,
        max_image_height: u32,
    ) -> Result<Self, PipelineError> {
        if input_width == 0 || input_height == 0 {
            return Err(PipelineError::InvalidDimensions {
                width: input_width,
                height: input_height,
            });
        }
        if max_image_height == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "max_image_height must be positive".to_string(),
            ));
        }

        let frame = Dimensions::new(input_width, input_height);
        let needs_rotation = input_height < input_width;
        let oriented = if needs_rotation {
            Dimensions::new(input_height, input_width)
        } else {
            frame
        };

        let needs_scaling = oriented.height > max_image_height;
        let working = if needs_scaling {
            let scaled_width =
                u64::from(oriented.width) * u64::from(max_image_height) / u64::from(oriented.height);
            // scaled_width <= oriented.width because the ratio is < 1.
            let scaled_width = u32::try_from(scaled_width).unwrap_or(oriented.width).max(1);
            Dimensions::new(scaled_width, max_image_height)
        } else {
            oriented
        };

        Ok(Self {
            frame,
            oriented,
            working,
            needs_rotation,
            needs_scaling,
        })
    }

    /// Horizontal factor from working to oriented coordinates.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        f64::from(self.oriented.width) / f64::from(self.working.width)
    }

    /// Vertical factor from working to oriented coordinates.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        f64::from(self.oriented.height) / f64::from(self.working.height)
    }

    /// Map a working-resolution point to the oriented output space.
    #[must_use]
    pub fn working_to_oriented(&self, p: Point) -> Point {
        Point::new(p.x * self.scale_x(), p.y * self.scale_y())
    }

    /// Map an oriented point to the working resolution.
    #[must_use]
    pub fn oriented_to_working(&self, p: Point) -> Point {
        Point::new(p.x / self.scale_x(), p.y / self.scale_y())
    }

    /// Map an oriented point back to the raw sensor frame, undoing the
    /// clockwise rotation.
    #[must_use]
    pub fn oriented_to_frame(&self, p: Point) -> Point {
        if self.needs_rotation {
            let last_row = f64::from(self.frame.height) - 1.0;
            Point::new(p.y, last_row - p.x)
        } else {
            p
        }
    }

    /// Map a raw sensor point into the oriented space.
    #[must_use]
    pub fn frame_to_oriented(&self, p: Point) -> Point {
        if self.needs_rotation {
            let last_row = f64::from(self.frame.height) - 1.0;
            Point::new(last_row - p.y, p.x)
        } else {
            p
        }
    }
}
