//! The drawing surface seam
//!
//! [`DrawSurface`] is the subset of a 2D canvas context the pipeline uses.
//! Hosts implement it over their real context; [`crate::Canvas`] implements
//! it by recording calls.

use bubble_core::{Color, Rect, Size};

use crate::canvas::Canvas;

/// Opaque handle to a host-owned image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// Immediate-mode 2D drawing surface, in actual canvas pixels
pub trait DrawSurface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    // === State ===

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn rotate(&mut self, angle: f32);
    fn scale(&mut self, sx: f32, sy: f32);
    fn set_global_alpha(&mut self, alpha: f32);
    fn set_fill_color(&mut self, color: Color);
    fn set_stroke_color(&mut self, color: Color);
    fn set_line_width(&mut self, width: f32);
    fn set_font_size(&mut self, size: f32);
    fn font_size(&self) -> f32;

    // === Rectangles ===

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    fn clear_rect(&mut self, rect: Rect);

    // === Text ===

    fn fill_text(&mut self, text: &str, x: f32, y: f32);
    /// Advance width of `text` at the current font size
    fn measure_text(&self, text: &str) -> f32;

    // === Paths ===

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);
    fn clip_rect(&mut self, rect: Rect);

    // === Images ===

    fn draw_image(&mut self, image: ImageId, dst: Rect);
    /// Blit the `src` part of an offscreen canvas into `dst`
    fn draw_canvas(&mut self, source: &Canvas, src: Rect, dst: Rect);
}
