//! Recording canvas
//!
//! [`Canvas`] stands in for an offscreen or headless 2D context. Every call
//! is appended to a command log along with the style it resolved to, and a
//! save/restore stack is kept exactly like a browser context would.

use smallvec::SmallVec;

use bubble_core::{Color, Point, Rect};

use crate::surface::{DrawSurface, ImageId};

/// Advance width of one glyph relative to the font size
const GLYPH_ADVANCE: f32 = 0.6;

/// A recorded draw call
#[derive(Clone, Debug, PartialEq)]
pub enum PaintCommand {
    Save,
    Restore,
    Translate { x: f32, y: f32 },
    Rotate { angle: f32 },
    Scale { sx: f32, sy: f32 },
    SetGlobalAlpha(f32),
    SetLineWidth(f32),
    SetFontSize(f32),
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    ClearRect { rect: Rect },
    FillText { text: String, position: Point, size: f32, color: Color },
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    Arc { center: Point, radius: f32, start_angle: f32, end_angle: f32 },
    ClosePath,
    Fill { color: Color, alpha: f32 },
    Stroke { color: Color, width: f32 },
    ClipRect { rect: Rect },
    DrawImage { image: ImageId, dst: Rect },
    /// Blit from another canvas; `commands` is the source's log length
    DrawCanvas { src: Rect, dst: Rect, commands: usize },
}

/// 2D affine transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::identity()
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    pub fn rotate(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self × other`: `other` is applied first
    pub fn then(&self, other: &Transform2D) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DrawState {
    transform: Transform2D,
    fill_color: Color,
    stroke_color: Color,
    line_width: f32,
    font_size: f32,
    global_alpha: f32,
    clip: Option<Rect>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform2D::identity(),
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: 1.0,
            font_size: 10.0,
            global_alpha: 1.0,
            clip: None,
        }
    }
}

/// A recording 2D canvas
#[derive(Clone, Debug)]
pub struct Canvas {
    width: f32,
    height: f32,
    state: DrawState,
    stack: SmallVec<[DrawState; 8]>,
    commands: Vec<PaintCommand>,
    history_limit: Option<usize>,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            state: DrawState::default(),
            stack: SmallVec::new(),
            commands: Vec::new(),
            history_limit: None,
        }
    }

    /// Keep at most `limit` commands, dropping the oldest first
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit.max(1));
        self
    }

    /// Resize the backing store. Like a browser canvas this resets all state.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.state = DrawState::default();
        self.stack.clear();
        self.commands.clear();
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Get all recorded commands
    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    /// Take ownership of recorded commands
    pub fn take_commands(&mut self) -> Vec<PaintCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_history(&mut self) {
        self.commands.clear();
    }

    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn transform(&self) -> Transform2D {
        self.state.transform
    }

    pub fn global_alpha(&self) -> f32 {
        self.state.global_alpha
    }

    pub fn fill_color(&self) -> Color {
        self.state.fill_color
    }

    pub fn line_width(&self) -> f32 {
        self.state.line_width
    }

    pub fn clip(&self) -> Option<Rect> {
        self.state.clip
    }

    fn record(&mut self, command: PaintCommand) {
        self.commands.push(command);
        if let Some(limit) = self.history_limit {
            if self.commands.len() > limit {
                let excess = self.commands.len() - limit;
                self.commands.drain(..excess);
            }
        }
    }

    fn concat(&mut self, transform: Transform2D) {
        self.state.transform = self.state.transform.then(&transform);
    }
}

impl DrawSurface for Canvas {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn save(&mut self) {
        self.stack.push(self.state);
        self.record(PaintCommand::Save);
    }

    fn restore(&mut self) {
        // An unmatched restore is ignored, as in a browser context
        let Some(state) = self.stack.pop() else {
            tracing::debug!("restore without matching save ignored");
            return;
        };
        self.state = state;
        self.record(PaintCommand::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.concat(Transform2D::translate(x, y));
        self.record(PaintCommand::Translate { x, y });
    }

    fn rotate(&mut self, angle: f32) {
        self.concat(Transform2D::rotate(angle));
        self.record(PaintCommand::Rotate { angle });
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(Transform2D::scale(sx, sy));
        self.record(PaintCommand::Scale { sx, sy });
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        // Out-of-range alpha is ignored by browsers too
        if !(0.0..=1.0).contains(&alpha) {
            return;
        }
        self.state.global_alpha = alpha;
        self.record(PaintCommand::SetGlobalAlpha(alpha));
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke_color = color;
    }

    fn set_line_width(&mut self, width: f32) {
        if !(width.is_finite() && width > 0.0) {
            return;
        }
        self.state.line_width = width;
        self.record(PaintCommand::SetLineWidth(width));
    }

    fn set_font_size(&mut self, size: f32) {
        if !(size.is_finite() && size > 0.0) {
            return;
        }
        self.state.font_size = size;
        self.record(PaintCommand::SetFontSize(size));
    }

    fn font_size(&self) -> f32 {
        self.state.font_size
    }

    fn fill_rect(&mut self, rect: Rect) {
        let color = self.state.fill_color;
        self.record(PaintCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let (color, width) = (self.state.stroke_color, self.state.line_width);
        self.record(PaintCommand::StrokeRect { rect, color, width });
    }

    fn clear_rect(&mut self, rect: Rect) {
        // Clearing everything makes earlier commands unobservable
        let covers_all = self.state.transform.is_identity()
            && rect.x <= 0.0
            && rect.y <= 0.0
            && rect.right() >= self.width
            && rect.bottom() >= self.height;
        if covers_all {
            self.commands.clear();
        }
        self.record(PaintCommand::ClearRect { rect });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let (size, color) = (self.state.font_size, self.state.fill_color);
        self.record(PaintCommand::FillText {
            text: text.to_string(),
            position: Point::new(x, y),
            size,
            color,
        });
    }

    fn measure_text(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.state.font_size * GLYPH_ADVANCE
    }

    fn begin_path(&mut self) {
        self.record(PaintCommand::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.record(PaintCommand::MoveTo(Point::new(x, y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.record(PaintCommand::LineTo(Point::new(x, y)));
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32) {
        self.record(PaintCommand::Arc {
            center: Point::new(x, y),
            radius,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.record(PaintCommand::ClosePath);
    }

    fn fill(&mut self) {
        let (color, alpha) = (self.state.fill_color, self.state.global_alpha);
        self.record(PaintCommand::Fill { color, alpha });
    }

    fn stroke(&mut self) {
        let (color, width) = (self.state.stroke_color, self.state.line_width);
        self.record(PaintCommand::Stroke { color, width });
    }

    fn clip_rect(&mut self, rect: Rect) {
        let clip = match self.state.clip {
            Some(current) => current.intersection(&rect).unwrap_or(Rect::ZERO),
            None => rect,
        };
        self.state.clip = Some(clip);
        self.record(PaintCommand::ClipRect { rect });
    }

    fn draw_image(&mut self, image: ImageId, dst: Rect) {
        self.record(PaintCommand::DrawImage { image, dst });
    }

    fn draw_canvas(&mut self, source: &Canvas, src: Rect, dst: Rect) {
        self.record(PaintCommand::DrawCanvas {
            src,
            dst,
            commands: source.commands.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn test_save_restore_restores_state() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.set_fill_color(Color::RED);
        canvas.save();
        canvas.set_fill_color(Color::BLUE);
        canvas.translate(10.0, 5.0);
        canvas.set_global_alpha(0.5);
        assert_eq!(canvas.save_depth(), 1);

        canvas.restore();
        assert_eq!(canvas.save_depth(), 0);
        assert_eq!(canvas.fill_color(), Color::RED);
        assert_eq!(canvas.global_alpha(), 1.0);
        assert!(canvas.transform().is_identity());
    }

    #[test]
    fn test_unmatched_restore_is_ignored() {
        let mut canvas = Canvas::new(10.0, 10.0);
        canvas.restore();
        assert_eq!(canvas.save_depth(), 0);
        assert!(canvas.commands().is_empty());
    }

    #[test]
    fn test_transform_composition() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.translate(50.0, 50.0);
        canvas.scale(2.0, 2.0);
        let p = canvas.transform().apply(Point::new(1.0, 1.0));
        assert!(close(p, Point::new(52.0, 52.0)));

        canvas.rotate(std::f32::consts::FRAC_PI_2);
        let p = canvas.transform().apply(Point::new(1.0, 0.0));
        assert!(close(p, Point::new(50.0, 52.0)));
    }

    #[test]
    fn test_fill_records_resolved_style() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.set_fill_color(Color::GREEN);
        canvas.fill_rect(Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(
            canvas.commands(),
            &[PaintCommand::FillRect {
                rect: Rect::new(1.0, 2.0, 3.0, 4.0),
                color: Color::GREEN,
            }]
        );
    }

    #[test]
    fn test_measure_text() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.set_font_size(20.0);
        assert_eq!(canvas.measure_text("hello"), 60.0);
        assert_eq!(canvas.measure_text(""), 0.0);
    }

    #[test]
    fn test_full_clear_discards_history() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        canvas.clear_rect(Rect::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(canvas.commands().len(), 2);

        canvas.clear_rect(canvas.bounds());
        assert_eq!(
            canvas.commands(),
            &[PaintCommand::ClearRect {
                rect: Rect::new(0.0, 0.0, 100.0, 100.0)
            }]
        );
    }

    #[test]
    fn test_history_limit() {
        let mut canvas = Canvas::new(10.0, 10.0).with_history_limit(3);
        for _ in 0..5 {
            canvas.begin_path();
        }
        canvas.close_path();
        assert_eq!(canvas.commands().len(), 3);
        assert_eq!(canvas.commands().last(), Some(&PaintCommand::ClosePath));
    }

    #[test]
    fn test_clip_intersects() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.clip_rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        canvas.clip_rect(Rect::new(25.0, 25.0, 50.0, 50.0));
        assert_eq!(canvas.clip(), Some(Rect::new(25.0, 25.0, 25.0, 25.0)));
    }
}
