//! Render objects and per-object drawing

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use bubble_core::{CanvasInfo, Color, Point, Rect, Result, Size};
use bubble_paint::DrawSurface;

/// Custom drawing for a [`RenderObject`].
///
/// The surface arrives translated to the object's center and scaled so one
/// unit is one base unit times the object's own scale. Rotation and opacity
/// are already applied.
pub trait ObjectRenderer {
    fn render(&self, surface: &mut dyn DrawSurface, object: &RenderObject) -> Result<()>;
}

impl<F> ObjectRenderer for F
where
    F: Fn(&mut dyn DrawSurface, &RenderObject) -> Result<()>,
{
    fn render(&self, surface: &mut dyn DrawSurface, object: &RenderObject) -> Result<()> {
        self(surface, object)
    }
}

/// Something to draw this frame, positioned by its center in base coordinates
#[derive(Clone)]
pub struct RenderObject {
    /// Stable across frames; change detection keys on it
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
    /// Radians
    pub rotation: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Target layer; `None` or an unknown name uses the default layer
    pub layer: Option<String>,
    pub renderer: Option<Rc<dyn ObjectRenderer>>,
}

impl RenderObject {
    pub fn new(id: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            color: Color::WHITE,
            rotation: 0.0,
            scale: 1.0,
            opacity: 1.0,
            layer: None,
            renderer: None,
        }
    }

    /// A round object of diameter `size`
    pub fn bubble(id: impl Into<String>, x: f32, y: f32, size: f32, color: Color) -> Self {
        Self::new(id, x, y, size, size).with_color(color)
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_renderer(mut self, renderer: impl ObjectRenderer + 'static) -> Self {
        self.renderer = Some(Rc::new(renderer));
        self
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.width,
            self.height,
            self.rotation,
            self.scale,
            self.opacity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Axis-aligned bounds in base coordinates.
    ///
    /// Rotated objects use the square around their diagonal.
    pub fn base_bounds(&self) -> Rect {
        let (w, h) = (self.width * self.scale, self.height * self.scale);
        let size = if self.rotation != 0.0 {
            let diagonal = w.hypot(h);
            Size::new(diagonal, diagonal)
        } else {
            Size::new(w.abs(), h.abs())
        };
        Rect::centered(Point::new(self.x, self.y), size)
    }

    /// Drawn-state fields that require a redraw when they change
    pub(crate) fn appearance(&self) -> Appearance {
        Appearance {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            color: self.color,
            rotation: self.rotation,
            scale: self.scale,
            opacity: self.opacity,
        }
    }
}

impl fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderObject")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("color", &self.color)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .field("opacity", &self.opacity)
            .field("layer", &self.layer)
            .field("custom_renderer", &self.renderer.is_some())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Appearance {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Color,
    rotation: f32,
    scale: f32,
    opacity: f32,
}

/// Map base bounds to actual pixels
pub fn to_pixel_bounds(base: &Rect, info: &CanvasInfo) -> Rect {
    Rect::new(
        base.x * info.scale_x,
        base.y * info.scale_y,
        base.width * info.scale_x,
        base.height * info.scale_y,
    )
}

/// Saves surface state on creation and restores it on drop.
///
/// The restore also runs when the guarded code returns early with an error
/// or unwinds.
pub struct SaveGuard<'a> {
    surface: &'a mut dyn DrawSurface,
}

impl<'a> SaveGuard<'a> {
    pub fn new(surface: &'a mut dyn DrawSurface) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<'a> Deref for SaveGuard<'a> {
    type Target = dyn DrawSurface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl<'a> DerefMut for SaveGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

/// Draw one object in its own saved state
pub(crate) fn draw_object(
    surface: &mut dyn DrawSurface,
    object: &RenderObject,
    info: &CanvasInfo,
) -> Result<()> {
    let mut guard = SaveGuard::new(surface);
    guard.translate(object.x * info.scale_x, object.y * info.scale_y);
    if object.rotation != 0.0 {
        guard.rotate(object.rotation);
    }
    let scale = info.uniform_scale() * object.scale;
    guard.scale(scale, scale);
    guard.set_global_alpha(object.opacity.clamp(0.0, 1.0));

    match &object.renderer {
        Some(renderer) => renderer.render(&mut *guard, object),
        None => {
            draw_bubble(&mut *guard, object);
            Ok(())
        }
    }
}

/// Default look: a filled circle fitting the object's box
fn draw_bubble(surface: &mut dyn DrawSurface, object: &RenderObject) {
    let radius = object.width.min(object.height).abs() / 2.0;
    surface.set_fill_color(object.color);
    surface.begin_path();
    surface.arc(0.0, 0.0, radius, 0.0, std::f32::consts::TAU);
    surface.fill();
}
