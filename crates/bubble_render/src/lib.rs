//! Bubble Render
//!
//! Minimizes redraw work for the bubble canvas:
//!
//! - **Change detection**: objects are diffed by id against the previous
//!   frame
//! - **Dirty regions**: changed bounds merge into a non-overlapping set that
//!   collapses to a full redraw past a threshold
//! - **Viewport culling**: objects outside the padded viewport are skipped
//! - **Layers**: z-ordered offscreen canvases composited only where dirty

pub mod dirty;
pub mod layer;
pub mod object;
pub mod optimizer;
pub mod viewport;

pub use dirty::DirtyRegionSet;
pub use layer::{Layer, LayerStack};
pub use object::{to_pixel_bounds, ObjectRenderer, RenderObject, SaveGuard};
pub use optimizer::{RenderOptimizer, RenderStats};
pub use viewport::Viewport;
