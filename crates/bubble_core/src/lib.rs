//! Bubble Core
//!
//! Foundational pieces shared by the bubble render pipeline:
//!
//! - **Geometry & Color**: `Point`, `Size`, `Rect` and RGBA colors
//! - **Coordinate Scaling**: base-resolution to canvas-pixel mapping with a
//!   memoized conversion cache
//! - **UI Placement**: responsive HUD positions in base coordinates
//! - **Object Pools**: slot-indexed free-list pools and a pool manager
//! - **Configuration & Errors**: TOML config and the shared error type
//!
//! # Example
//!
//! ```rust
//! use bubble_core::{CanvasConfig, CanvasMetrics, ScaledCoordinateManager};
//!
//! let mut coords = ScaledCoordinateManager::new(CanvasConfig::default());
//! coords.update_canvas_dimensions(CanvasMetrics::new(1600.0, 900.0, 1.0));
//!
//! assert_eq!(coords.scale_x(), 2.0);
//! assert_eq!(coords.scale_y(), 1.5);
//! assert_eq!(coords.uniform_scale(), 1.5);
//! ```

pub mod color;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod fallback;
pub mod geometry;
pub mod pool;
pub mod ui_position;

pub use color::Color;
pub use config::{
    BubbleConfig, CanvasConfig, PoolConfig, QualityConfig, RenderConfig, Sensitivity,
    ValidationConfig,
};
pub use coordinates::{CanvasInfo, CanvasMetrics, ScaledCoordinateManager};
pub use error::{BubbleError, Result};
pub use fallback::{ensure_finite, with_fallback, with_fallback_else};
pub use geometry::{Point, Rect, Size};
pub use pool::{
    Bubble, FloatingText, ManagedPool, ObjectPool, Particle, PoolAdjustment, PoolHandle,
    PoolManager, PoolStats,
};
pub use ui_position::{
    Breakpoint, Edge, Margins, StatusKind, UiElement, UiPositionCalculator, FALLBACK_POSITION,
};
