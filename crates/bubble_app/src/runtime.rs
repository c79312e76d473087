//! Runtime composition root
//!
//! [`BubbleRuntime`] owns one instance of every rendering service and hands
//! out borrows. Nothing is global: tests and hosts build as many runtimes as
//! they like.

use bubble_core::{
    BubbleConfig, CanvasInfo, CanvasMetrics, PoolAdjustment, PoolManager, Result,
    ScaledCoordinateManager, UiPositionCalculator,
};
use bubble_paint::{DrawSurface, ScaledRenderingContext};
use bubble_quality::{
    detect_optimal_level, AdaptiveQualityController, DeviceCapabilities, PreferenceStore,
    QualityEvent, QualityLevel, QualitySettings,
};
use bubble_render::{RenderObject, RenderOptimizer, RenderStats};

use crate::timer::{TimerId, TimerRegistry};

/// Periodic work scheduled by the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeTask {
    QualitySample,
    PoolOptimize,
}

/// What happened during one frame
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub frame: u64,
    pub frame_time_ms: f32,
    pub render: RenderStats,
    pub quality_level: QualityLevel,
    pub settings: QualitySettings,
    pub pool_adjustments: Vec<PoolAdjustment>,
    pub quality_events: Vec<QualityEvent>,
}

/// Owns the coordinate manager, UI calculator, render optimizer, pools and
/// quality controller, and drives them from the frame protocol:
///
/// ```text
/// start_frame(now) -> add_object()* -> render_frame(surface) -> end_frame(now)
/// ```
pub struct BubbleRuntime {
    config: BubbleConfig,
    coordinates: ScaledCoordinateManager,
    ui: UiPositionCalculator,
    renderer: RenderOptimizer,
    pools: PoolManager,
    quality: AdaptiveQualityController,
    timers: TimerRegistry<RuntimeTask>,
    quality_timer: TimerId,
    pool_timer: TimerId,
    frame_started_ms: Option<u64>,
    last_render: RenderStats,
    frames: u64,
    destroyed: bool,
}

impl BubbleRuntime {
    /// Build every service from `config`. Fails only if the config is invalid.
    pub fn new(config: BubbleConfig, store: Box<dyn PreferenceStore>) -> Result<Self> {
        config.validate()?;
        let quality = AdaptiveQualityController::new(config.quality.clone(), store);
        Ok(Self::assemble(config, quality))
    }

    /// Like [`new`](Self::new), starting from the level `caps` suggest when
    /// no level is stored or configured
    pub fn with_capabilities(
        config: BubbleConfig,
        store: Box<dyn PreferenceStore>,
        caps: &DeviceCapabilities,
    ) -> Result<Self> {
        config.validate()?;
        let fallback = AdaptiveQualityController::configured_level(&config.quality)
            .unwrap_or_else(|| detect_optimal_level(caps));
        let quality = AdaptiveQualityController::with_level(config.quality.clone(), store, fallback);
        Ok(Self::assemble(config, quality))
    }

    fn assemble(config: BubbleConfig, quality: AdaptiveQualityController) -> Self {
        let coordinates = ScaledCoordinateManager::new(config.canvas.clone());
        let info = coordinates.canvas_info();
        let mut timers = TimerRegistry::new();
        let quality_timer = timers.schedule(
            RuntimeTask::QualitySample,
            config.quality.sample_interval_ms,
            0,
        );
        let pool_timer = timers.schedule(
            RuntimeTask::PoolOptimize,
            config.pool.optimize_interval_ms,
            0,
        );
        tracing::debug!(
            level = %quality.current_level(),
            width = info.actual_width,
            height = info.actual_height,
            "runtime assembled"
        );

        Self {
            ui: UiPositionCalculator::new(info),
            renderer: RenderOptimizer::new(config.render.clone(), info),
            pools: PoolManager::with_render_pools(config.pool.clone()),
            coordinates,
            quality,
            timers,
            quality_timer,
            pool_timer,
            frame_started_ms: None,
            last_render: RenderStats::default(),
            frames: 0,
            config,
            destroyed: false,
        }
    }

    /// Propagate new canvas metrics to every scale-aware service
    pub fn resize(&mut self, metrics: CanvasMetrics) -> CanvasInfo {
        let info = self.coordinates.update_canvas_dimensions(metrics);
        self.ui.update_canvas_info(info);
        self.renderer.update_canvas(&info);
        info
    }

    pub fn start_frame(&mut self, now_ms: u64) {
        if self.destroyed {
            tracing::debug!("start_frame after destroy ignored");
            return;
        }
        self.renderer.start_frame();
        self.quality.advance(now_ms);
        self.frame_started_ms = Some(now_ms);
    }

    pub fn add_object(&mut self, object: RenderObject) {
        if !self.destroyed {
            self.renderer.add_object(object);
        }
    }

    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = RenderObject>) {
        if !self.destroyed {
            self.renderer.add_objects(objects);
        }
    }

    pub fn render_frame(&mut self, surface: &mut dyn DrawSurface) -> RenderStats {
        if self.destroyed {
            tracing::debug!("render_frame after destroy ignored");
            return RenderStats::default();
        }
        self.last_render = self.renderer.render(surface);
        self.last_render
    }

    /// Close the frame: feed its duration to the quality monitor and run any
    /// timers that came due. Returns `None` once destroyed.
    pub fn end_frame(&mut self, now_ms: u64) -> Option<FrameReport> {
        if self.destroyed {
            tracing::debug!("end_frame after destroy ignored");
            return None;
        }
        self.frames += 1;
        let frame_time_ms = self
            .frame_started_ms
            .take()
            .map_or(0.0, |start| now_ms.saturating_sub(start) as f32);
        if frame_time_ms > 0.0 {
            self.quality.record_frame(frame_time_ms);
        }

        let mut pool_adjustments = Vec::new();
        for task in self.timers.due(now_ms) {
            match task {
                RuntimeTask::QualitySample => self.quality.tick(now_ms),
                RuntimeTask::PoolOptimize => pool_adjustments.extend(self.pools.optimize()),
            }
        }

        Some(FrameReport {
            frame: self.frames,
            frame_time_ms,
            render: self.last_render,
            quality_level: self.quality.current_level(),
            settings: self.quality.settings(),
            pool_adjustments,
            quality_events: self.quality.drain_events(),
        })
    }

    /// Scale a requested object count by the current particle density
    pub fn object_budget(&self, base: usize) -> usize {
        let density = self.quality.settings().particle_density.max(0.0);
        (base as f32 * density).round() as usize
    }

    /// A scaling wrapper over `surface` for HUD and overlay drawing
    pub fn scaled<'a, S: DrawSurface + ?Sized>(
        &'a self,
        surface: &'a mut S,
    ) -> ScaledRenderingContext<'a, S> {
        ScaledRenderingContext::new(surface, &self.coordinates)
    }

    /// Cancel timers and persist quality state. Later frame calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let cancelled = self.timers.cancel_all();
        tracing::debug!(cancelled, "runtime timers cancelled");
        self.quality.destroy();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.config
    }

    pub fn canvas_info(&self) -> CanvasInfo {
        self.coordinates.canvas_info()
    }

    pub fn coordinates(&self) -> &ScaledCoordinateManager {
        &self.coordinates
    }

    pub fn ui(&self) -> &UiPositionCalculator {
        &self.ui
    }

    pub fn renderer(&self) -> &RenderOptimizer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut RenderOptimizer {
        &mut self.renderer
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut PoolManager {
        &mut self.pools
    }

    pub fn quality(&self) -> &AdaptiveQualityController {
        &self.quality
    }

    pub fn quality_mut(&mut self) -> &mut AdaptiveQualityController {
        &mut self.quality
    }

    pub fn timers(&self) -> &TimerRegistry<RuntimeTask> {
        &self.timers
    }

    pub fn quality_timer(&self) -> TimerId {
        self.quality_timer
    }

    pub fn pool_timer(&self) -> TimerId {
        self.pool_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubble_core::{Color, Particle};
    use bubble_paint::{Canvas, PaintCommand};
    use bubble_quality::MemoryStore;

    fn runtime() -> BubbleRuntime {
        BubbleRuntime::new(BubbleConfig::default(), Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BubbleConfig::default();
        config.canvas.base_width = 0.0;
        assert!(BubbleRuntime::new(config, Box::new(MemoryStore::new())).is_err());
    }

    #[test]
    fn test_unknown_starting_level_falls_back_for_both_constructors() {
        let mut config = BubbleConfig::default();
        config.quality.starting_level = Some("ultra-max".to_string());

        let plain = BubbleRuntime::new(config.clone(), Box::new(MemoryStore::new())).unwrap();
        assert_eq!(plain.quality().current_level(), QualityLevel::High);

        let caps = DeviceCapabilities {
            accelerated: true,
            memory_gb: Some(2.0),
            cores: Some(4),
        };
        let detected =
            BubbleRuntime::with_capabilities(config, Box::new(MemoryStore::new()), &caps).unwrap();
        assert_eq!(detected.quality().current_level(), QualityLevel::Medium);
    }

    #[test]
    fn test_frame_records_frame_time() {
        let mut runtime = runtime();
        let mut canvas = Canvas::new(800.0, 600.0);

        runtime.start_frame(0);
        runtime.add_object(RenderObject::bubble("b", 100.0, 100.0, 20.0, Color::RED));
        let stats = runtime.render_frame(&mut canvas);
        assert_eq!(stats.rendered_objects, 1);

        let report = runtime.end_frame(16).unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.frame_time_ms, 16.0);
        assert_eq!(runtime.quality().monitor().pending_frames(), 1);
    }

    #[test]
    fn test_quality_timer_samples_monitor() {
        let mut runtime = runtime();
        let mut canvas = Canvas::new(800.0, 600.0);
        let mut now = 0;
        while now < 1_000 {
            runtime.start_frame(now);
            runtime.render_frame(&mut canvas);
            now += 20;
            runtime.end_frame(now);
        }
        // Sampled at 500 and 1000
        assert_eq!(runtime.quality().monitor().history().len(), 2);
    }

    #[test]
    fn test_resize_reaches_every_service() {
        let mut runtime = runtime();
        let info = runtime.resize(CanvasMetrics::new(1600.0, 1200.0, 1.0));
        assert_eq!(info.scale_x, 2.0);
        assert_eq!(runtime.renderer().canvas_info(), info);
        assert_eq!(runtime.coordinates().uniform_scale(), 2.0);
    }

    #[test]
    fn test_scaled_hud_drawing() {
        let mut runtime = runtime();
        runtime.resize(CanvasMetrics::new(1600.0, 1200.0, 1.0));
        let score = runtime.ui().position("status:score");
        let mut canvas = Canvas::new(1600.0, 1200.0);
        {
            let mut hud = runtime.scaled(&mut canvas);
            hud.fill_text("Score: 10", score.x, score.y, 16.0);
        }
        assert!(canvas.commands().iter().any(|c| matches!(
            c,
            PaintCommand::FillText { size, .. } if *size == 32.0
        )));
    }

    #[test]
    fn test_object_budget_follows_density() {
        let mut runtime = runtime();
        assert_eq!(runtime.object_budget(10), 10);

        runtime.quality_mut().set_quality_level(QualityLevel::Low, false, 0);
        runtime.start_frame(5_000);
        assert_eq!(runtime.object_budget(10), 5);
    }

    #[test]
    fn test_destroy_stops_everything() {
        let mut runtime = runtime();
        let mut canvas = Canvas::new(800.0, 600.0);
        runtime.destroy();
        assert!(runtime.timers().is_empty());
        assert!(!runtime.timers().is_scheduled(runtime.quality_timer()));

        runtime.start_frame(0);
        runtime.add_object(RenderObject::bubble("b", 1.0, 1.0, 2.0, Color::RED));
        assert_eq!(runtime.render_frame(&mut canvas), RenderStats::default());
        assert!(runtime.end_frame(10_000).is_none());
        assert!(canvas.commands().is_empty());
        assert_eq!(runtime.frame_count(), 0);
    }

    #[test]
    fn test_pools_available() {
        let mut runtime = runtime();
        let pool = runtime.pools_mut().pool_mut::<Particle>("particle").unwrap();
        let handle = pool.acquire();
        assert!(pool.release(handle));
    }
}
