//! Bubble Paint
//!
//! The drawing side of the render pipeline.
//!
//! # Features
//!
//! - [`DrawSurface`]: the 2D context seam hosts implement
//! - [`Canvas`]: a recording surface used for offscreen layers, headless
//!   runs and tests
//! - [`ScaledRenderingContext`]: draw calls in base coordinates, scaled to
//!   canvas pixels with per-call fallback

pub mod canvas;
pub mod scaled;
pub mod surface;

pub use canvas::{Canvas, PaintCommand, Transform2D};
pub use scaled::{SavedState, ScaledRenderingContext};
pub use surface::{DrawSurface, ImageId};
