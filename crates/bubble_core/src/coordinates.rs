//! Base-to-canvas coordinate scaling
//!
//! Game and UI code is authored against a fixed base resolution (800x600 by
//! default). [`ScaledCoordinateManager`] maps that space onto the canvas's
//! actual pixel buffer, which is the display size multiplied by the device
//! pixel ratio.
//!
//! Two scale notions are tracked:
//!
//! - `scale_x` / `scale_y`: actual pixels per base unit, per axis. All point
//!   and size conversions use these.
//! - `scale_factor`: the uniform display (CSS pixel) scale,
//!   `min(display_width / base_width, display_height / base_height)`.
//!
//! Conversions are memoized in a small LRU cache keyed by the input bit
//! patterns. The cache remembers the scale it was filled under and is flushed
//! as soon as the scale changes.

use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::config::CanvasConfig;
use crate::error::{BubbleError, Result};
use crate::fallback::{ensure_finite, with_fallback, with_fallback_else};
use crate::geometry::{Point, Size};

/// Box metrics reported by the host for the canvas element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasMetrics {
    pub display_width: f32,
    pub display_height: f32,
    pub pixel_ratio: f32,
}

impl CanvasMetrics {
    pub const fn new(display_width: f32, display_height: f32, pixel_ratio: f32) -> Self {
        Self {
            display_width,
            display_height,
            pixel_ratio,
        }
    }

    fn validate(&self) -> Result<()> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if usable(self.display_width) && usable(self.display_height) && usable(self.pixel_ratio) {
            Ok(())
        } else {
            Err(BubbleError::EnvironmentUnavailable(format!(
                "canvas metrics {}x{} @{}",
                self.display_width, self.display_height, self.pixel_ratio
            )))
        }
    }
}

/// Resolved mapping between base and actual canvas space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasInfo {
    pub base_width: f32,
    pub base_height: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub actual_width: f32,
    pub actual_height: f32,
    pub pixel_ratio: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Uniform display scale
    pub scale_factor: f32,
}

impl CanvasInfo {
    /// Base space mapped 1:1 onto the canvas.
    pub fn identity(base_width: f32, base_height: f32) -> Self {
        Self {
            base_width,
            base_height,
            display_width: base_width,
            display_height: base_height,
            actual_width: base_width,
            actual_height: base_height,
            pixel_ratio: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_factor: 1.0,
        }
    }

    pub fn from_metrics(base_width: f32, base_height: f32, metrics: CanvasMetrics) -> Result<Self> {
        metrics.validate()?;
        let actual_width = metrics.display_width * metrics.pixel_ratio;
        let actual_height = metrics.display_height * metrics.pixel_ratio;
        Ok(Self {
            base_width,
            base_height,
            display_width: metrics.display_width,
            display_height: metrics.display_height,
            actual_width,
            actual_height,
            pixel_ratio: metrics.pixel_ratio,
            scale_x: actual_width / base_width,
            scale_y: actual_height / base_height,
            scale_factor: (metrics.display_width / base_width)
                .min(metrics.display_height / base_height),
        })
    }

    pub fn uniform_scale(&self) -> f32 {
        self.scale_x.min(self.scale_y)
    }

    pub fn actual_size(&self) -> Size {
        Size::new(self.actual_width, self.actual_height)
    }

    pub fn base_size(&self) -> Size {
        Size::new(self.base_width, self.base_height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ConversionKind {
    Position,
    Size,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: ConversionKind,
    a: u32,
    b: u32,
}

impl CacheKey {
    fn new(kind: ConversionKind, a: f32, b: f32) -> Self {
        Self {
            kind,
            a: a.to_bits(),
            b: b.to_bits(),
        }
    }
}

/// Maps base coordinates onto the actual canvas and back
pub struct ScaledCoordinateManager {
    config: CanvasConfig,
    info: CanvasInfo,
    cache: RefCell<LruCache<CacheKey, (f32, f32)>>,
    /// Scale the cache contents were computed under
    cached_scale: Cell<(f32, f32)>,
}

impl ScaledCoordinateManager {
    pub fn new(config: CanvasConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        let info = CanvasInfo::identity(config.base_width, config.base_height);
        Self {
            config,
            info,
            cache: RefCell::new(LruCache::new(capacity)),
            cached_scale: Cell::new((info.scale_x, info.scale_y)),
        }
    }

    /// Create a manager already sized to `metrics`
    pub fn with_metrics(config: CanvasConfig, metrics: CanvasMetrics) -> Self {
        let mut manager = Self::new(config);
        manager.update_canvas_dimensions(metrics);
        manager
    }

    /// Recompute the mapping after the host canvas resized.
    ///
    /// Unusable metrics degrade to the identity mapping.
    pub fn update_canvas_dimensions(&mut self, metrics: CanvasMetrics) -> CanvasInfo {
        let (base_width, base_height) = (self.config.base_width, self.config.base_height);
        let info = with_fallback_else(
            "ScaledCoordinateManager::update_canvas_dimensions",
            || CanvasInfo::from_metrics(base_width, base_height, metrics),
            || CanvasInfo::identity(base_width, base_height),
        );

        let changed = info.scale_x != self.info.scale_x || info.scale_y != self.info.scale_y;
        self.info = info;
        if changed {
            tracing::debug!(
                scale_x = info.scale_x,
                scale_y = info.scale_y,
                "canvas scale changed, flushing conversion cache"
            );
            self.invalidate_cache();
        }
        info
    }

    pub fn canvas_info(&self) -> CanvasInfo {
        self.info
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scale_x(&self) -> f32 {
        self.info.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.info.scale_y
    }

    pub fn uniform_scale(&self) -> f32 {
        self.info.uniform_scale()
    }

    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
        self.cached_scale.set((self.info.scale_x, self.info.scale_y));
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    // === Points ===

    pub fn try_to_canvas_coordinates(&self, x: f32, y: f32) -> Result<Point> {
        ensure_finite("to_canvas_coordinates", x, y)?;
        Ok(Point::new(x * self.info.scale_x, y * self.info.scale_y))
    }

    pub fn try_to_base_coordinates(&self, x: f32, y: f32) -> Result<Point> {
        ensure_finite("to_base_coordinates", x, y)?;
        Ok(Point::new(x / self.info.scale_x, y / self.info.scale_y))
    }

    /// Base point to canvas pixels; non-finite input passes through unscaled
    pub fn to_canvas_coordinates(&self, x: f32, y: f32) -> Point {
        with_fallback(
            "ScaledCoordinateManager::to_canvas_coordinates",
            Point::new(x, y),
            || self.try_to_canvas_coordinates(x, y),
        )
    }

    /// Canvas pixels to base point; non-finite input passes through unscaled
    pub fn to_base_coordinates(&self, x: f32, y: f32) -> Point {
        with_fallback(
            "ScaledCoordinateManager::to_base_coordinates",
            Point::new(x, y),
            || self.try_to_base_coordinates(x, y),
        )
    }

    /// Cached form of [`Self::to_canvas_coordinates`]
    pub fn scaled_position(&self, x: f32, y: f32) -> Point {
        let (px, py) = self.cached(ConversionKind::Position, x, y, || {
            self.try_to_canvas_coordinates(x, y).map(|p| (p.x, p.y))
        });
        Point::new(px, py)
    }

    // === Sizes ===

    pub fn try_scaled_size(&self, width: f32, height: f32) -> Result<Size> {
        ensure_finite("scaled_size", width, height)?;
        Ok(Size::new(width * self.info.scale_x, height * self.info.scale_y))
    }

    pub fn scaled_size(&self, width: f32, height: f32) -> Size {
        let (w, h) = self.cached(ConversionKind::Size, width, height, || {
            self.try_scaled_size(width, height).map(|s| (s.width, s.height))
        });
        Size::new(w, h)
    }

    /// Font size in canvas pixels, clamped to a legible range
    pub fn scaled_font_size(&self, base_size: f32) -> f32 {
        let scaled = base_size * self.uniform_scale();
        if !scaled.is_finite() {
            return self.config.min_font_size;
        }
        scaled.clamp(self.config.min_font_size, self.config.max_font_size)
    }

    /// Stroke width in canvas pixels, clamped so strokes stay visible
    pub fn scaled_line_width(&self, base_width: f32) -> f32 {
        let scaled = base_width * self.uniform_scale();
        if !scaled.is_finite() {
            return self.config.min_line_width;
        }
        scaled.clamp(self.config.min_line_width, self.config.max_line_width)
    }

    /// Check that centered text fits on the canvas.
    ///
    /// `anchor` is in base space; `text_width` and `font_size` are the
    /// measured width and font size in canvas pixels.
    pub fn validate_text_bounds(&self, anchor: Point, text_width: f32, font_size: f32) -> bool {
        let Ok(center) = self.try_to_canvas_coordinates(anchor.x, anchor.y) else {
            return false;
        };
        if !(text_width.is_finite() && font_size.is_finite()) {
            return false;
        }

        let left = center.x - text_width / 2.0;
        let right = center.x + text_width / 2.0;
        // Approximate ascent/descent from the font size
        let top = center.y - font_size * 0.8;
        let bottom = center.y + font_size * 0.2;

        left >= 0.0
            && right <= self.info.actual_width
            && top >= 0.0
            && bottom <= self.info.actual_height
    }

    fn cached(
        &self,
        kind: ConversionKind,
        a: f32,
        b: f32,
        compute: impl FnOnce() -> Result<(f32, f32)>,
    ) -> (f32, f32) {
        let scale = (self.info.scale_x, self.info.scale_y);
        if self.cached_scale.get() != scale {
            self.invalidate_cache();
        }

        let key = CacheKey::new(kind, a, b);
        if let Some(hit) = self.cache.borrow_mut().get(&key) {
            return *hit;
        }

        match compute() {
            Ok(value) => {
                self.cache.borrow_mut().put(key, value);
                value
            }
            Err(err) => {
                tracing::warn!(error = %err, "coordinate conversion failed, using unscaled input");
                (a, b)
            }
        }
    }
}
