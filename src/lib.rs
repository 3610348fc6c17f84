//! # compass-overlay
//!
//! **An augmented-reality compass drawn over a live view.**
//!
//! A sphere of latitude rings and meridians is rotated by the device's
//! orientation, projected to screen space and drawn as line segments with
//! bearing labels. Rotations arrive on one thread and draws happen on
//! another; a single lock hands finished frames across.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use compass_overlay::*;
//!
//! struct Host;
//!
//! impl OverlayHost for Host {
//!     fn request_redraw(&self) {}
//! }
//!
//! # fn main() -> Result<()> {
//! let mut pipeline = OverlayPipeline::new(OverlayConfig::default(), Arc::new(Host))?;
//! pipeline.layout_changed(1080, 1920)?;
//!
//! // Producer side: feed rotations.
//! let rotation = Orientation::new(90.0, 10.0, 0.0).to_rotation();
//! pipeline.apply_rotation(&Transform::from(rotation))?;
//!
//! // Render side: draw the last published frame.
//! let mut canvas = RecordingCanvas::new(1080, 1920);
//! pipeline.reader().draw(&mut canvas);
//! # Ok(())
//! # }
//! ```
//!
//! The `compass-overlay` binary hosts the same pipeline in a window, with a
//! keyboard-driven orientation instead of sensors.

mod canvas;
pub mod components;
mod config;
mod display;
mod draw2d;
mod error;
mod font;
mod gpu;
mod input;
mod line_batch;
mod logging;
mod orientation;
mod pipeline;
mod projection;
mod transform;
pub mod viewer;

pub use canvas::{Canvas, Color, DrawCmd, Paint, PaintStyle, RecordingCanvas, TextAlign};
pub use config::{
    DEFAULT_FIELD_OF_VIEW, DEFAULT_ORTHOGRAPHIC_SCALE, MAX_FIELD_OF_VIEW, MAX_ORTHOGRAPHIC_SCALE,
    MIN_FIELD_OF_VIEW, MIN_ORTHOGRAPHIC_SCALE, OverlayConfig, ProjectionMode, SettingRange,
    field_of_view_from_camera,
};
pub use display::{DisplayRotation, rotation_from_row_major};
pub use draw2d::{Draw2d, ShapeBuffer, Vertex2d};
pub use error::{OverlayError, Result};
pub use font::{FontAtlas, GlyphInfo, GlyphMetrics};
pub use gpu::GpuContext;
pub use line_batch::LineBatch;
pub use logging::{LoggingConfig, init_logging};
pub use orientation::{LookDirectionEstimator, Orientation, OrientationEstimator};
pub use pipeline::{FrameReader, OverlayHost, OverlayPipeline, PublishedFrame, format_display_text};
pub use projection::{FAR_PLANE, Projection};
pub use transform::{Point3, Point4, Transform};

// Re-export the math types the public API is expressed in.
pub use glam::{Mat4, Vec3, Vec4};
