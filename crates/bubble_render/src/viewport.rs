//! Viewport culling

use bubble_core::Rect;

/// Visible area in actual pixels, padded by `margin` on every side
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub rect: Rect,
    pub margin: f32,
}

impl Viewport {
    pub fn new(rect: Rect, margin: f32) -> Self {
        Self { rect, margin }
    }

    /// The culling rectangle: the viewport grown by the margin
    pub fn padded(&self) -> Rect {
        self.rect.expand(self.margin)
    }

    /// Whether any part of `bounds` lies within the padded viewport.
    ///
    /// Touching the padded edge counts as visible so zero-size objects on
    /// the boundary are not dropped.
    pub fn is_visible(&self, bounds: &Rect) -> bool {
        let area = self.padded();
        bounds.right() >= area.x
            && bounds.x <= area.right()
            && bounds.bottom() >= area.y
            && bounds.y <= area.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_keeps_nearby_objects() {
        let viewport = Viewport::new(Rect::new(0.0, 0.0, 800.0, 600.0), 50.0);
        assert!(viewport.is_visible(&Rect::new(100.0, 100.0, 10.0, 10.0)));
        assert!(viewport.is_visible(&Rect::new(-40.0, 100.0, 10.0, 10.0)));
        assert!(viewport.is_visible(&Rect::new(845.0, 100.0, 10.0, 10.0)));
        assert!(!viewport.is_visible(&Rect::new(-70.0, 100.0, 10.0, 10.0)));
        assert!(!viewport.is_visible(&Rect::new(100.0, 700.0, 10.0, 10.0)));
    }

    #[test]
    fn test_non_finite_bounds_are_culled() {
        let viewport = Viewport::new(Rect::new(0.0, 0.0, 800.0, 600.0), 50.0);
        assert!(!viewport.is_visible(&Rect::new(f32::NAN, 0.0, 10.0, 10.0)));
    }
}
