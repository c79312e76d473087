//! Frame-over-frame render optimizer
//!
//! Per frame: [`RenderOptimizer::start_frame`], any number of
//! [`RenderOptimizer::add_object`] calls, [`RenderOptimizer::detect_changes`]
//! and finally [`RenderOptimizer::render`], which consumes the frame's
//! objects. `render` runs change detection itself if the caller skipped it.
//!
//! Only dirty rectangles are redrawn on each layer and blitted to the main
//! surface. The first frame, and any frame after a resize, viewport change
//! or [`RenderOptimizer::invalidate_all`], redraws the whole canvas. A frame
//! with nothing dirty composites nothing.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use bubble_core::{CanvasInfo, Rect, RenderConfig};
use bubble_paint::DrawSurface;

use crate::dirty::DirtyRegionSet;
use crate::layer::{Layer, LayerStack};
use crate::object::{draw_object, to_pixel_bounds, Appearance, RenderObject, SaveGuard};
use crate::viewport::Viewport;

/// Counters for one rendered frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    pub total_objects: usize,
    /// Objects drawn into at least one dirty region
    pub rendered_objects: usize,
    /// Objects outside the padded viewport
    pub culled_objects: usize,
    pub dirty_regions: usize,
    pub full_redraw: bool,
    /// Nothing changed, so nothing was drawn
    pub skipped: bool,
    /// Objects whose custom renderer failed
    pub render_errors: usize,
}

/// What an object looked like when last seen
#[derive(Clone, Copy, Debug, PartialEq)]
struct Snapshot {
    appearance: Appearance,
    base_bounds: Rect,
    layer: usize,
}

pub struct RenderOptimizer {
    config: RenderConfig,
    info: CanvasInfo,
    viewport: Viewport,
    layers: LayerStack,
    dirty: DirtyRegionSet,
    objects: IndexMap<String, RenderObject>,
    last_frame: FxHashMap<String, Snapshot>,
    full_redraw: bool,
    changes_detected: bool,
    frame: u64,
    stats: RenderStats,
}

impl RenderOptimizer {
    pub fn new(config: RenderConfig, info: CanvasInfo) -> Self {
        let bounds = canvas_bounds(&info);
        Self {
            viewport: Viewport::new(bounds, config.cull_margin),
            layers: LayerStack::new(config.default_layer.clone(), bounds),
            dirty: DirtyRegionSet::new(bounds, config.max_dirty_regions),
            config,
            info,
            objects: IndexMap::new(),
            last_frame: FxHashMap::default(),
            full_redraw: true,
            changes_detected: false,
            frame: 0,
            stats: RenderStats::default(),
        }
    }

    /// Begin a frame. Objects left over from an unrendered frame are dropped.
    pub fn start_frame(&mut self) {
        if !self.objects.is_empty() {
            tracing::debug!(
                count = self.objects.len(),
                "discarding objects from a frame that was never rendered"
            );
            self.objects.clear();
        }
        self.changes_detected = false;
        self.frame += 1;
    }

    /// Queue an object for this frame. A later object with the same id
    /// replaces the earlier one.
    pub fn add_object(&mut self, object: RenderObject) {
        if !object.is_finite() {
            tracing::warn!(id = %object.id, "dropping render object with non-finite geometry");
            return;
        }
        // Objects added after a diff join it on the next detect_changes()
        self.changes_detected = false;
        if self.objects.insert(object.id.clone(), object).is_some() {
            tracing::trace!("render object id submitted twice in one frame");
        }
    }

    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = RenderObject>) {
        for object in objects {
            self.add_object(object);
        }
    }

    /// Move the visible area (actual pixels). Any change forces a full redraw.
    pub fn update_viewport(&mut self, rect: Rect) {
        if rect != self.viewport.rect {
            self.viewport.rect = rect;
            self.full_redraw = true;
        }
    }

    /// Track a resized canvas. Layers are resized and the viewport resets to
    /// the whole canvas.
    pub fn update_canvas(&mut self, info: &CanvasInfo) {
        self.info = *info;
        let bounds = canvas_bounds(info);
        self.layers.resize(bounds);
        self.dirty.set_bounds(bounds);
        self.viewport = Viewport::new(bounds, self.config.cull_margin);
        self.full_redraw = true;
    }

    /// Force the next frame to redraw everything
    pub fn invalidate_all(&mut self) {
        self.full_redraw = true;
    }

    /// Add a layer. Returns false if the name is taken.
    pub fn create_layer(&mut self, name: &str, z_index: i32) -> bool {
        let created = self.layers.create(name, z_index, self.dirty.bounds());
        if created {
            // A new layer starts empty, so everything is recomposited
            self.full_redraw = true;
        }
        created
    }

    /// Diff this frame's objects against the previous frame and mark dirty
    /// rectangles for everything added, changed or removed.
    pub fn detect_changes(&mut self) {
        let mut next = FxHashMap::with_capacity_and_hasher(self.objects.len(), Default::default());

        for (id, object) in &self.objects {
            let snapshot = Snapshot {
                appearance: object.appearance(),
                base_bounds: object.base_bounds(),
                layer: self.layers.resolve(object.layer.as_deref()),
            };
            match self.last_frame.remove(id) {
                Some(old) if old == snapshot => {}
                Some(old) => {
                    mark(&mut self.dirty, &self.info, &old.base_bounds);
                    mark(&mut self.dirty, &self.info, &snapshot.base_bounds);
                }
                None => mark(&mut self.dirty, &self.info, &snapshot.base_bounds),
            }
            next.insert(id.clone(), snapshot);
        }

        // Whatever is left was not submitted this frame
        for (_, removed) in self.last_frame.drain() {
            mark(&mut self.dirty, &self.info, &removed.base_bounds);
        }

        self.last_frame = next;
        self.changes_detected = true;
    }

    /// Redraw dirty regions of every layer and composite them onto `main`.
    pub fn render(&mut self, main: &mut dyn DrawSurface) -> RenderStats {
        if !self.changes_detected {
            self.detect_changes();
        }

        let bounds = self.dirty.bounds();
        let full = self.full_redraw || self.dirty.is_full();
        let mut stats = RenderStats {
            total_objects: self.objects.len(),
            full_redraw: full,
            ..Default::default()
        };

        if !full && self.dirty.is_empty() {
            stats.skipped = true;
            stats.culled_objects = self
                .objects
                .values()
                .filter(|o| {
                    let pixel = to_pixel_bounds(&o.base_bounds(), &self.info);
                    !self.viewport.is_visible(&pixel)
                })
                .count();
            self.finish_frame(stats);
            return stats;
        }

        let regions: SmallVec<[Rect; 8]> = if full {
            smallvec![bounds]
        } else {
            self.dirty.regions().iter().copied().collect()
        };
        stats.dirty_regions = regions.len();

        {
            let info = self.info;
            let mut buckets: Vec<Vec<(&RenderObject, Rect)>> = vec![Vec::new(); self.layers.len()];
            for object in self.objects.values() {
                let pixel = to_pixel_bounds(&object.base_bounds(), &info);
                if !self.viewport.is_visible(&pixel) {
                    stats.culled_objects += 1;
                    continue;
                }
                if regions.iter().any(|r| r.intersects(&pixel)) {
                    stats.rendered_objects += 1;
                }
                let layer = self.layers.resolve(object.layer.as_deref());
                buckets[layer].push((object, pixel));
            }

            let mut failed: FxHashSet<&str> = FxHashSet::default();
            for (layer, bucket) in self.layers.layers_mut().iter_mut().zip(&buckets) {
                redraw_layer(layer, bucket, &regions, full, &info, &mut failed);
            }
            stats.render_errors = failed.len();
        }

        composite(main, &self.layers, &regions, full, bounds);
        self.finish_frame(stats);
        stats
    }

    /// Stats of the last rendered frame
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Dirty regions pending for the next render
    pub fn dirty_regions(&self) -> &[Rect] {
        self.dirty.regions()
    }

    /// Whether the next render will redraw the whole canvas
    pub fn needs_full_redraw(&self) -> bool {
        self.full_redraw || self.dirty.is_full()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn canvas_info(&self) -> CanvasInfo {
        self.info
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    fn finish_frame(&mut self, stats: RenderStats) {
        tracing::trace!(
            frame = self.frame,
            rendered = stats.rendered_objects,
            culled = stats.culled_objects,
            regions = stats.dirty_regions,
            full = stats.full_redraw,
            "frame rendered"
        );
        self.objects.clear();
        self.dirty.clear();
        self.full_redraw = false;
        self.changes_detected = false;
        self.stats = stats;
    }
}

fn canvas_bounds(info: &CanvasInfo) -> Rect {
    Rect::new(0.0, 0.0, info.actual_width, info.actual_height)
}

fn mark(dirty: &mut DirtyRegionSet, info: &CanvasInfo, base_bounds: &Rect) {
    dirty.insert(to_pixel_bounds(base_bounds, info));
}

fn redraw_layer<'o>(
    layer: &mut Layer,
    objects: &[(&'o RenderObject, Rect)],
    regions: &[Rect],
    full: bool,
    info: &CanvasInfo,
    failed: &mut FxHashSet<&'o str>,
) {
    let canvas = layer.canvas_mut();
    if full {
        let bounds = canvas.bounds();
        canvas.clear_rect(bounds);
    }

    for region in regions {
        let mut guard = SaveGuard::new(&mut *canvas);
        guard.clip_rect(*region);
        if !full {
            guard.clear_rect(*region);
        }
        for &(object, pixel) in objects {
            if !region.intersects(&pixel) {
                continue;
            }
            if let Err(err) = draw_object(&mut *guard, object, info) {
                if failed.insert(object.id.as_str()) {
                    tracing::error!(id = %object.id, error = %err, "custom renderer failed");
                }
            }
        }
    }
}

fn composite(
    main: &mut dyn DrawSurface,
    layers: &LayerStack,
    regions: &[Rect],
    full: bool,
    bounds: Rect,
) {
    if full {
        main.clear_rect(bounds);
        for layer in layers.iter() {
            main.draw_canvas(layer.canvas(), bounds, bounds);
        }
        return;
    }
    for region in regions {
        main.clear_rect(*region);
        for layer in layers.iter() {
            main.draw_canvas(layer.canvas(), *region, *region);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubble_core::{BubbleError, Color};
    use bubble_paint::{Canvas, PaintCommand};

    fn optimizer() -> RenderOptimizer {
        RenderOptimizer::new(RenderConfig::default(), CanvasInfo::identity(800.0, 600.0))
    }

    fn bubble(id: &str, x: f32, y: f32) -> RenderObject {
        RenderObject::bubble(id, x, y, 20.0, Color::RED)
    }

    fn frame(
        opt: &mut RenderOptimizer,
        main: &mut Canvas,
        objects: Vec<RenderObject>,
    ) -> RenderStats {
        opt.start_frame();
        opt.add_objects(objects);
        opt.render(main)
    }

    #[test]
    fn test_first_frame_is_full_redraw() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        let stats = frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);
        assert!(stats.full_redraw);
        assert_eq!(stats.rendered_objects, 1);
        assert_eq!(stats.dirty_regions, 1);
        assert!(main.commands().contains(&PaintCommand::DrawCanvas {
            src: Rect::new(0.0, 0.0, 800.0, 600.0),
            dst: Rect::new(0.0, 0.0, 800.0, 600.0),
            commands: opt.layers().get("main").map(|l| l.canvas().commands().len()).unwrap_or(0),
        }));
    }

    #[test]
    fn test_unchanged_frame_is_skipped() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);
        main.clear_history();

        let stats = frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);
        assert!(stats.skipped);
        assert_eq!(stats.rendered_objects, 0);
        assert!(main.commands().is_empty());
    }

    #[test]
    fn test_moved_object_marks_old_and_new_bounds() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("bubble_1", 100.0, 100.0)]);

        opt.start_frame();
        opt.add_object(bubble("bubble_1", 300.0, 300.0));
        opt.detect_changes();
        let mut regions = opt.dirty_regions().to_vec();
        regions.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(
            regions,
            vec![
                Rect::new(90.0, 90.0, 20.0, 20.0),
                Rect::new(290.0, 290.0, 20.0, 20.0)
            ]
        );

        let stats = opt.render(&mut main);
        assert!(!stats.full_redraw);
        assert_eq!(stats.dirty_regions, 2);
        assert_eq!(stats.rendered_objects, 1);
    }

    #[test]
    fn test_small_move_merges_regions() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("bubble_1", 100.0, 100.0)]);

        opt.start_frame();
        opt.add_object(bubble("bubble_1", 105.0, 100.0));
        opt.detect_changes();
        assert_eq!(opt.dirty_regions(), &[Rect::new(90.0, 90.0, 25.0, 20.0)]);
    }

    #[test]
    fn test_removed_object_marks_old_bounds() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0), bubble("b", 400.0, 400.0)]);

        opt.start_frame();
        opt.add_object(bubble("b", 400.0, 400.0));
        opt.detect_changes();
        assert_eq!(opt.dirty_regions(), &[Rect::new(90.0, 90.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_appearance_change_is_detected() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);

        for changed in [
            bubble("a", 100.0, 100.0).with_color(Color::BLUE),
            bubble("a", 100.0, 100.0).with_opacity(0.5),
            bubble("a", 100.0, 100.0).with_rotation(0.1),
            bubble("a", 100.0, 100.0).with_scale(1.5),
        ] {
            let stats = frame(&mut opt, &mut main, vec![changed]);
            assert!(!stats.skipped);
        }
    }

    #[test]
    fn test_viewport_culling() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        let stats = frame(
            &mut opt,
            &mut main,
            vec![
                bubble("inside", 400.0, 300.0),
                bubble("margin", 830.0, 300.0),
                bubble("outside", 1000.0, 300.0),
            ],
        );
        assert_eq!(stats.total_objects, 3);
        assert_eq!(stats.culled_objects, 1);
        // The margin object survives culling but lies off the canvas
        assert_eq!(stats.rendered_objects, 1);
    }

    #[test]
    fn test_many_regions_collapse_to_full() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        let spread = |dx: f32| {
            (0..12)
                .map(|i| bubble(&format!("b{i}"), 30.0 + i as f32 * 60.0 + dx, 300.0))
                .collect::<Vec<_>>()
        };
        frame(&mut opt, &mut main, spread(0.0));

        let mut objects = spread(0.0);
        objects.push(bubble("new", 1.0, 1.0));
        let stats = frame(&mut opt, &mut main, objects);
        assert!(!stats.full_redraw);

        // Every bubble moves far enough to leave its old box
        let stats = frame(&mut opt, &mut main, spread(25.0));
        assert!(stats.full_redraw);
        assert_eq!(stats.dirty_regions, 1);
    }

    #[test]
    fn test_layers_composite_in_z_order() {
        let mut opt = optimizer();
        opt.create_layer("background", -1);
        opt.create_layer("ui", 10);
        let mut main = Canvas::new(800.0, 600.0);
        frame(
            &mut opt,
            &mut main,
            vec![
                bubble("bg", 100.0, 100.0).on_layer("background"),
                bubble("hud", 200.0, 100.0).on_layer("ui"),
                bubble("stray", 300.0, 100.0).on_layer("missing"),
            ],
        );

        let blits = main
            .commands()
            .iter()
            .filter(|c| matches!(c, PaintCommand::DrawCanvas { .. }))
            .count();
        assert_eq!(blits, 3);

        let arcs_on = |name: &str| {
            opt.layers()
                .get(name)
                .map(|l| {
                    l.canvas()
                        .commands()
                        .iter()
                        .filter(|c| matches!(c, PaintCommand::Arc { .. }))
                        .count()
                })
                .unwrap_or(0)
        };
        assert_eq!(arcs_on("background"), 1);
        assert_eq!(arcs_on("ui"), 1);
        assert_eq!(arcs_on("main"), 1);
    }

    #[test]
    fn test_failing_renderer_is_counted_and_contained() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        let broken = RenderObject::new("broken", 100.0, 100.0, 10.0, 10.0).with_renderer(
            |_: &mut dyn DrawSurface, object: &RenderObject| -> bubble_core::Result<()> {
                Err(BubbleError::render(object.id.clone(), "boom"))
            },
        );
        let stats = frame(&mut opt, &mut main, vec![broken, bubble("ok", 200.0, 200.0)]);
        assert_eq!(stats.render_errors, 1);
        assert_eq!(stats.rendered_objects, 2);
        assert_eq!(opt.layers().get("main").map(|l| l.canvas().save_depth()), Some(0));
    }

    #[test]
    fn test_resize_forces_full_redraw_in_new_scale() {
        let mut opt = optimizer();
        let mut main = Canvas::new(800.0, 600.0);
        frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);

        let info = CanvasInfo::from_metrics(
            800.0,
            600.0,
            bubble_core::CanvasMetrics::new(1600.0, 1200.0, 1.0),
        )
        .unwrap();
        opt.update_canvas(&info);
        assert!(opt.needs_full_redraw());
        let stats = frame(&mut opt, &mut main, vec![bubble("a", 100.0, 100.0)]);
        assert!(stats.full_redraw);

        opt.start_frame();
        opt.add_object(bubble("a", 300.0, 100.0));
        opt.detect_changes();
        let mut regions = opt.dirty_regions().to_vec();
        regions.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(
            regions,
            vec![
                Rect::new(180.0, 180.0, 40.0, 40.0),
                Rect::new(580.0, 180.0, 40.0, 40.0)
            ]
        );
    }

    #[test]
    fn test_non_finite_object_is_dropped() {
        let mut opt = optimizer();
        opt.start_frame();
        opt.add_object(bubble("nan", f32::NAN, 0.0));
        assert_eq!(opt.object_count(), 0);
    }
}
