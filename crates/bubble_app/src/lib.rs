//! Bubble App
//!
//! Wires the rendering services into a single [`BubbleRuntime`] and drives
//! them through a frame protocol. [`HeadlessRuntime`] runs whole sessions
//! against a recording canvas for diagnostics and tests.
//!
//! # Example
//!
//! ```
//! use bubble_app::BubbleRuntime;
//! use bubble_core::{BubbleConfig, CanvasMetrics, Color};
//! use bubble_paint::Canvas;
//! use bubble_quality::MemoryStore;
//! use bubble_render::RenderObject;
//!
//! let mut runtime = BubbleRuntime::new(BubbleConfig::default(), Box::new(MemoryStore::new()))?;
//! runtime.resize(CanvasMetrics::new(800.0, 600.0, 2.0));
//! let mut canvas = Canvas::new(1600.0, 1200.0);
//!
//! runtime.start_frame(0);
//! runtime.add_object(RenderObject::bubble("b1", 400.0, 300.0, 40.0, Color::BLUE));
//! let stats = runtime.render_frame(&mut canvas);
//! assert_eq!(stats.rendered_objects, 1);
//! runtime.end_frame(16);
//! # Ok::<(), bubble_core::BubbleError>(())
//! ```

mod headless;
mod runtime;
mod timer;

pub use headless::{HeadlessContext, HeadlessReport, HeadlessRunConfig, HeadlessRuntime};
pub use runtime::{BubbleRuntime, FrameReport, RuntimeTask};
pub use timer::{TimerId, TimerRegistry};
