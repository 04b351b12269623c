//! camscan-pipeline: Single-frame document boundary detection (sans-IO).
//!
//! Finds the outline of a paper document in a camera frame and renders
//! it as a transparent overlay through:
//! frame adapter -> content suppression -> blur + Canny ->
//! contour selection -> compositor.
//!
//! This crate has **no I/O dependencies** -- it borrows the luminance
//! plane of an in-memory frame and returns owned images. Camera, display
//! and filesystem interaction live in the caller (see `camscan-bench`).
//!
//! ```no_run
//! use camscan_pipeline::{Frame, Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), camscan_pipeline::PipelineError> {
//! let luma = vec![0u8; 1920 * 1080];
//! let mut pipeline = Pipeline::new(1920, 1080, PipelineConfig::default())?;
//! let output = pipeline.process(&Frame::from_luma(1920, 1080, &luma))?;
//! if let Some(corners) = output.corners {
//!     let on_screen = corners.to_output_space(pipeline.geometry());
//!     println!("document at {:?}", on_screen.points());
//! }
//! # Ok(())
//! # }
//! ```

pub mod blur;
pub mod canny;
pub mod compositor;
pub mod config;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod frame;
pub mod geometry;
pub mod morphology;
pub mod pipeline;
pub mod resample;
pub mod select;
pub mod settings;
pub mod simplify;
pub mod types;

pub use config::PipelineConfig;
pub use diagnostics::{Clock, FrameDiagnostics, StageDiagnostics, StageMetrics, SystemClock};
pub use frame::{Frame, Plane};
pub use geometry::Geometry;
pub use pipeline::Pipeline;
pub use settings::{SettingsError, apply_setting, config_from_settings};
pub use types::{
    Color, DebugStage, Dimensions, DocumentCorners, FrameOutput, PipelineError, Point, StageImage,
};
