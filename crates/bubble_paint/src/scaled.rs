//! Base-coordinate drawing over a pixel surface
//!
//! [`ScaledRenderingContext`] accepts every position and size in base
//! coordinates and converts them through the [`ScaledCoordinateManager`]
//! before reaching the surface. A conversion failure only affects the call
//! that hit it: the raw arguments are forwarded unchanged and a warning is
//! logged.

use std::time::Instant;

use bubble_core::{
    ensure_finite, with_fallback, Color, Point, Rect, Result, ScaledCoordinateManager,
};

use crate::surface::{DrawSurface, ImageId};

/// Diagnostic record pushed on every `save()`
#[derive(Clone, Copy, Debug)]
pub struct SavedState {
    pub saved_at: Instant,
    /// Uniform scale in effect when the state was saved
    pub scale_factor: f32,
}

pub struct ScaledRenderingContext<'a, S: DrawSurface + ?Sized> {
    surface: &'a mut S,
    coords: &'a ScaledCoordinateManager,
    states: Vec<SavedState>,
}

impl<'a, S: DrawSurface + ?Sized> ScaledRenderingContext<'a, S> {
    pub fn new(surface: &'a mut S, coords: &'a ScaledCoordinateManager) -> Self {
        Self {
            surface,
            coords,
            states: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &*self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut *self.surface
    }

    pub fn coordinates(&self) -> &ScaledCoordinateManager {
        self.coords
    }

    // === State ===

    pub fn save(&mut self) {
        self.surface.save();
        self.states.push(SavedState {
            saved_at: Instant::now(),
            scale_factor: self.coords.uniform_scale(),
        });
    }

    pub fn restore(&mut self) {
        if self.states.pop().is_none() {
            tracing::warn!("ScaledRenderingContext::restore called without a matching save");
            return;
        }
        self.surface.restore();
    }

    /// Number of unmatched `save()` calls
    pub fn state_depth(&self) -> usize {
        self.states.len()
    }

    pub fn saved_states(&self) -> &[SavedState] {
        &self.states
    }

    // === Style ===

    pub fn set_fill_color(&mut self, color: Color) {
        self.surface.set_fill_color(color);
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.surface.set_stroke_color(color);
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.surface.set_global_alpha(alpha);
    }

    /// Line width in base units, scaled and clamped
    pub fn set_line_width(&mut self, base_width: f32) {
        let width = self.coords.scaled_line_width(base_width);
        self.surface.set_line_width(width);
    }

    // === Rectangles ===

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let rect = self.scaled_rect("ScaledRenderingContext::fill_rect", x, y, width, height);
        self.surface.fill_rect(rect);
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let rect = self.scaled_rect("ScaledRenderingContext::stroke_rect", x, y, width, height);
        self.surface.stroke_rect(rect);
    }

    pub fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let rect = self.scaled_rect("ScaledRenderingContext::clear_rect", x, y, width, height);
        self.surface.clear_rect(rect);
    }

    // === Text ===

    /// Draw text at a base position with a base font size
    pub fn fill_text(&mut self, text: &str, x: f32, y: f32, base_font_size: f32) {
        let position = self.scaled_point("ScaledRenderingContext::fill_text", x, y);
        self.surface
            .set_font_size(self.coords.scaled_font_size(base_font_size));
        self.surface.fill_text(text, position.x, position.y);
    }

    /// Whether `text` centered on the base point fits on the canvas at the
    /// surface's current font size
    pub fn validate_text(&self, text: &str, x: f32, y: f32) -> bool {
        let width = self.surface.measure_text(text);
        self.coords
            .validate_text_bounds(Point::new(x, y), width, self.surface.font_size())
    }

    // === Images ===

    pub fn draw_image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32) {
        let dst = self.scaled_rect("ScaledRenderingContext::draw_image", x, y, width, height);
        self.surface.draw_image(image, dst);
    }

    // === Paths ===

    pub fn begin_path(&mut self) {
        self.surface.begin_path();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        let p = self.scaled_point("ScaledRenderingContext::move_to", x, y);
        self.surface.move_to(p.x, p.y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        let p = self.scaled_point("ScaledRenderingContext::line_to", x, y);
        self.surface.line_to(p.x, p.y);
    }

    /// Arc around a base center; the radius scales uniformly
    pub fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32) {
        let (center, radius) = with_fallback(
            "ScaledRenderingContext::arc",
            (Point::new(x, y), radius),
            || {
                ensure_finite("arc", radius, 0.0)?;
                let center = self.coords.try_to_canvas_coordinates(x, y)?;
                Ok((center, radius * self.coords.uniform_scale()))
            },
        );
        self.surface
            .arc(center.x, center.y, radius, start_angle, end_angle);
    }

    pub fn close_path(&mut self) {
        self.surface.close_path();
    }

    pub fn fill(&mut self) {
        self.surface.fill();
    }

    pub fn stroke(&mut self) {
        self.surface.stroke();
    }

    fn scaled_point(&self, context: &str, x: f32, y: f32) -> Point {
        with_fallback(context, Point::new(x, y), || {
            self.coords.try_to_canvas_coordinates(x, y)
        })
    }

    fn scaled_rect(&self, context: &str, x: f32, y: f32, width: f32, height: f32) -> Rect {
        with_fallback(context, Rect::new(x, y, width, height), || {
            self.try_scaled_rect(x, y, width, height)
        })
    }

    fn try_scaled_rect(&self, x: f32, y: f32, width: f32, height: f32) -> Result<Rect> {
        let origin = self.coords.try_to_canvas_coordinates(x, y)?;
        let size = self.coords.try_scaled_size(width, height)?;
        Ok(Rect::new(origin.x, origin.y, size.width, size.height))
    }
}

impl<S: DrawSurface + ?Sized> Drop for ScaledRenderingContext<'_, S> {
    fn drop(&mut self) {
        if !self.states.is_empty() {
            tracing::warn!(
                depth = self.states.len(),
                "scaled rendering context dropped with unbalanced save()"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, PaintCommand};
    use bubble_core::{CanvasConfig, CanvasMetrics};

    fn coords(width: f32, height: f32) -> ScaledCoordinateManager {
        ScaledCoordinateManager::with_metrics(
            CanvasConfig::default(),
            CanvasMetrics::new(width, height, 1.0),
        )
    }

    #[test]
    fn test_rect_is_scaled() {
        let coords = coords(1600.0, 1200.0);
        let mut canvas = Canvas::new(1600.0, 1200.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.set_fill_color(Color::RED);
        ctx.fill_rect(10.0, 20.0, 30.0, 40.0);
        drop(ctx);

        assert_eq!(
            canvas.commands(),
            &[PaintCommand::FillRect {
                rect: Rect::new(20.0, 40.0, 60.0, 80.0),
                color: Color::RED,
            }]
        );
    }

    #[test]
    fn test_non_finite_input_passes_raw_arguments() {
        let coords = coords(1600.0, 1200.0);
        let mut canvas = Canvas::new(1600.0, 1200.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.stroke_rect(f32::NAN, 5.0, 10.0, 10.0);
        ctx.move_to(1.0, 1.0);
        drop(ctx);

        match &canvas.commands()[0] {
            PaintCommand::StrokeRect { rect, .. } => {
                assert!(rect.x.is_nan());
                assert_eq!((rect.y, rect.width, rect.height), (5.0, 10.0, 10.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        // The bad call did not affect the next one
        assert_eq!(canvas.commands()[1], PaintCommand::MoveTo(Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_text_font_is_scaled_and_clamped() {
        let coords = coords(1600.0, 1200.0);
        let mut canvas = Canvas::new(1600.0, 1200.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.fill_text("score", 10.0, 10.0, 16.0);
        ctx.fill_text("tiny", 10.0, 10.0, 1.0);
        drop(ctx);

        let sizes: Vec<f32> = canvas
            .commands()
            .iter()
            .filter_map(|c| match c {
                PaintCommand::FillText { size, .. } => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![32.0, 8.0]);
    }

    #[test]
    fn test_arc_radius_scales_uniformly() {
        let coords = coords(1600.0, 900.0);
        let mut canvas = Canvas::new(1600.0, 900.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.arc(100.0, 100.0, 10.0, 0.0, std::f32::consts::TAU);
        drop(ctx);

        assert_eq!(
            canvas.commands()[0],
            PaintCommand::Arc {
                center: Point::new(200.0, 150.0),
                radius: 15.0,
                start_angle: 0.0,
                end_angle: std::f32::consts::TAU,
            }
        );
    }

    #[test]
    fn test_save_restore_balance() {
        let coords = coords(800.0, 600.0);
        let mut canvas = Canvas::new(800.0, 600.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.save();
        ctx.save();
        assert_eq!(ctx.state_depth(), 2);
        assert_eq!(ctx.saved_states()[0].scale_factor, 1.0);
        ctx.restore();
        ctx.restore();
        ctx.restore();
        assert_eq!(ctx.state_depth(), 0);
        drop(ctx);

        let restores = canvas
            .commands()
            .iter()
            .filter(|c| **c == PaintCommand::Restore)
            .count();
        assert_eq!(restores, 2);
    }

    #[test]
    fn test_validate_text() {
        let coords = coords(800.0, 600.0);
        let mut canvas = Canvas::new(800.0, 600.0);
        canvas.set_font_size(20.0);
        let ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        assert!(ctx.validate_text("Game Over", 400.0, 300.0));
        assert!(!ctx.validate_text("Game Over", 10.0, 300.0));
    }

    #[test]
    fn test_line_width_is_clamped() {
        let coords = coords(80.0, 60.0);
        let mut canvas = Canvas::new(80.0, 60.0);
        let mut ctx = ScaledRenderingContext::new(&mut canvas, &coords);
        ctx.set_line_width(1.0);
        drop(ctx);
        assert_eq!(canvas.line_width(), 0.5);
    }
}
