//! Shared types for the document detection pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::FrameDiagnostics;
use crate::geometry::Geometry;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// rendered overlay without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
///
/// Traced contour points always have integer-valued coordinates; the
/// floating-point representation only matters once points are mapped
/// between the working and output resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new set of dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A straight (non-premultiplied) RGBA color used for overlay strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 = opaque).
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque green, the default overlay color.
    pub const GREEN: Self = Self::rgba(0, 255, 0, 255);

    /// Create a color from its four channels.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a color from a packed `0xAARRGGBB` integer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Pack the color as a `0xAARRGGBB` integer.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Channels in `[r, g, b, a]` order, as stored in an `RgbaImage`.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse `#RRGGBB`, `#AARRGGBB`, or one of a few color names.
    ///
    /// Returns `None` for anything else.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let value = u32::from_str_radix(hex, 16).ok()?;
            return match hex.len() {
                6 => Some(Self::from_argb(0xFF00_0000 | value)),
                8 => Some(Self::from_argb(value)),
                _ => None,
            };
        }
        let argb = match text.to_ascii_lowercase().as_str() {
            "black" => 0xFF00_0000,
            "white" => 0xFFFF_FFFF,
            "red" => 0xFFFF_0000,
            "green" => 0xFF00_FF00,
            "blue" => 0xFF00_00FF,
            "gray" | "grey" => 0xFF88_8888,
            "cyan" => 0xFF00_FFFF,
            "magenta" => 0xFFFF_00FF,
            "yellow" => 0xFFFF_FF00,
            "transparent" => 0x0000_0000,
            _ => return None,
        };
        Some(Self::from_argb(argb))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::GREEN
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.to_argb())
    }
}

/// Where the pipeline stops and what it returns.
///
/// The three raster taps return the working-resolution greyscale
/// buffer; the two overlay stages return a transparent RGBA canvas at
/// the oriented input resolution. Selecting a stage never changes the
/// order of the stages that run before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStage {
    /// Luminance plane after rotation and downscaling.
    Preprocessed,
    /// After morphological closing.
    ContentRemoved,
    /// Binary edge map.
    EdgesDetected,
    /// The top-ranked traced contours drawn as outlines.
    ContoursDetected,
    /// The detected document polygon (production output).
    #[default]
    CornersDetected,
}

impl DebugStage {
    /// Every stage, in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Preprocessed,
        Self::ContentRemoved,
        Self::EdgesDetected,
        Self::ContoursDetected,
        Self::CornersDetected,
    ];

    /// Stable numeric code used by persisted settings.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Preprocessed => 0,
            Self::ContentRemoved => 1,
            Self::EdgesDetected => 2,
            Self::ContoursDetected => 3,
            Self::CornersDetected => 4,
        }
    }

    /// Snake-case name, as used by `Display`, `FromStr` and serde.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Preprocessed => "preprocessed",
            Self::ContentRemoved => "content_removed",
            Self::EdgesDetected => "edges_detected",
            Self::ContoursDetected => "contours_detected",
            Self::CornersDetected => "corners_detected",
        }
    }

    /// Whether the stage returns a working-resolution raster tap
    /// instead of a full-resolution overlay.
    #[must_use]
    pub const fn is_raster_tap(self) -> bool {
        matches!(
            self,
            Self::Preprocessed | Self::ContentRemoved | Self::EdgesDetected
        )
    }
}

impl TryFrom<u8> for DebugStage {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for DebugStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DebugStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown debug stage: {s:?}"))
    }
}

/// The four corners of the detected document outline.
///
/// Points are in working-resolution pixel coordinates, in the order
/// the polygon approximation produced them (consecutive points are
/// adjacent corners).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentCorners([Point; 4]);

impl DocumentCorners {
    /// Wrap four corner points.
    #[must_use]
    pub const fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// The corner points.
    #[must_use]
    pub const fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Enclosed area of the quadrilateral (shoelace formula).
    #[must_use]
    pub fn area(&self) -> f64 {
        let p = &self.0;
        let twice: f64 = (0..4)
            .map(|i| {
                let a = p[i];
                let b = p[(i + 1) % 4];
                a.x.mul_add(b.y, -(b.x * a.y))
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Apply `f` to every corner.
    #[must_use]
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self(self.0.map(f))
    }

    /// Corners in the oriented, full-resolution output space.
    #[must_use]
    pub fn to_output_space(&self, geometry: &Geometry) -> Self {
        self.map(|p| geometry.working_to_oriented(p))
    }

    /// Corners in the raw sensor frame's coordinate space (undoing
    /// both scaling and rotation).
    #[must_use]
    pub fn to_frame_space(&self, geometry: &Geometry) -> Self {
        self.map(|p| geometry.oriented_to_frame(geometry.working_to_oriented(p)))
    }
}

/// The image returned for one frame.
#[derive(Debug, Clone)]
pub enum StageImage {
    /// A working-resolution greyscale raster tap.
    Luma(GrayImage),
    /// A transparent overlay canvas at the oriented input resolution.
    Rgba(RgbaImage),
}

impl StageImage {
    /// Size of the returned image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        match self {
            Self::Luma(img) => Dimensions::new(img.width(), img.height()),
            Self::Rgba(img) => Dimensions::new(img.width(), img.height()),
        }
    }

    /// Convert to RGBA for display. Greyscale taps become opaque grey.
    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        match self {
            Self::Luma(img) => RgbaImage::from_fn(img.width(), img.height(), |x, y| {
                let v = img.get_pixel(x, y).0[0];
                image::Rgba([v, v, v, 255])
            }),
            Self::Rgba(img) => img,
        }
    }
}

/// Everything the pipeline produced for one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// The stage that produced `image`.
    pub stage: DebugStage,
    /// The returned image. Ownership passes to the caller.
    pub image: StageImage,
    /// Detected document corners in working coordinates.
    ///
    /// `None` when no top-ranked contour reduced to four vertices, and
    /// always `None` for the raster taps. Not an error.
    pub corners: Option<DocumentCorners>,
    /// Number of contours traced in the edge map (0 for raster taps).
    pub contour_count: usize,
    /// Per-stage timing and metrics for this frame.
    pub diagnostics: FrameDiagnostics,
}

/// Errors that can occur while constructing or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input width or height is zero.
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfiguration(String),

    /// The frame has no readable luminance plane.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The frame does not match the geometry the pipeline was built for.
    #[error("frame is {actual} but the pipeline was built for {expected}")]
    FrameSizeMismatch {
        /// Dimensions the pipeline was constructed with.
        expected: Dimensions,
        /// Dimensions of the supplied frame.
        actual: Dimensions,
    },
}
