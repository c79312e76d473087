//! Deterministic headless sessions and their JSON report

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use bubble_core::CanvasMetrics;
use bubble_paint::Canvas;
use bubble_quality::{QualityEvent, QualityLevel, QualityStatistics, TransitionReport};
use bubble_render::RenderObject;

use crate::runtime::BubbleRuntime;

/// Commands the main recording canvas keeps between full clears
const MAIN_CANVAS_HISTORY: usize = 16_384;

/// Configuration for deterministic headless frame execution.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessRunConfig {
    /// Display width of the simulated canvas element.
    pub width: u32,
    /// Display height of the simulated canvas element.
    pub height: u32,
    pub pixel_ratio: f32,
    /// Number of frames to execute.
    pub max_frames: u32,
    /// Frame duration used when the frame callback does not supply one.
    pub tick_ms: u64,
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            pixel_ratio: 1.0,
            max_frames: 1,
            tick_ms: 16,
        }
    }
}

impl HeadlessRunConfig {
    pub fn metrics(&self) -> CanvasMetrics {
        CanvasMetrics::new(self.width as f32, self.height as f32, self.pixel_ratio)
    }
}

/// Frame context passed to headless frame callbacks.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessContext {
    pub frame_index: u32,
    pub width: u32,
    pub height: u32,
    /// Simulated time at the start of the frame
    pub elapsed_ms: u64,
}

/// Deterministic headless runtime loop.
pub struct HeadlessRuntime;

impl HeadlessRuntime {
    /// Run a fixed frame budget in headless mode.
    ///
    /// `on_frame` returns how long the frame took in milliseconds; zero
    /// means `cfg.tick_ms`.
    pub fn run<F>(cfg: HeadlessRunConfig, mut on_frame: F) -> Result<u64>
    where
        F: FnMut(&HeadlessContext) -> u64,
    {
        if cfg.width == 0 || cfg.height == 0 {
            bail!("headless dimensions must be non-zero");
        }
        if !(cfg.pixel_ratio.is_finite() && cfg.pixel_ratio > 0.0) {
            bail!("headless pixel_ratio must be positive");
        }
        if cfg.max_frames == 0 {
            bail!("headless max_frames must be > 0");
        }
        if cfg.tick_ms == 0 {
            bail!("headless tick_ms must be > 0");
        }

        let mut elapsed_ms: u64 = 0;
        for frame in 0..cfg.max_frames {
            let took = on_frame(&HeadlessContext {
                frame_index: frame,
                width: cfg.width,
                height: cfg.height,
                elapsed_ms,
            });
            let took = if took == 0 { cfg.tick_ms } else { took };
            elapsed_ms = elapsed_ms.saturating_add(took);
        }

        Ok(elapsed_ms)
    }

    /// Drive `runtime` through a whole session on a recording canvas.
    ///
    /// Each frame asks `objects` for the scene, passing `base_objects`
    /// scaled by the current quality, and `frame_time` for the simulated
    /// frame duration.
    pub fn simulate<O, T>(
        runtime: &mut BubbleRuntime,
        cfg: HeadlessRunConfig,
        base_objects: usize,
        mut objects: O,
        mut frame_time: T,
    ) -> Result<HeadlessReport>
    where
        O: FnMut(&HeadlessContext, usize) -> Vec<RenderObject>,
        T: FnMut(&HeadlessContext) -> u64,
    {
        let info = runtime.resize(cfg.metrics());
        let mut canvas = Canvas::new(info.actual_width, info.actual_height)
            .with_history_limit(MAIN_CANVAS_HISTORY);
        let mut report = HeadlessReport::new(runtime.quality().current_level());

        let elapsed_ms = Self::run(cfg, |ctx| {
            runtime.start_frame(ctx.elapsed_ms);
            let scene = objects(ctx, runtime.object_budget(base_objects));
            runtime.add_objects(scene);
            runtime.render_frame(&mut canvas);

            let took = match frame_time(ctx) {
                0 => cfg.tick_ms,
                ms => ms,
            };
            if let Some(frame) = runtime.end_frame(ctx.elapsed_ms + took) {
                report.record_frame(&frame);
            }
            took
        })?;

        report.elapsed_ms = elapsed_ms;
        report.final_level = runtime.quality().current_level();
        report.statistics = runtime.quality().statistics().clone();
        Ok(report)
    }
}

/// Machine-readable summary of a headless session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessReport {
    pub elapsed_frames: u64,
    pub elapsed_ms: u64,
    pub rendered_frames: u64,
    pub skipped_frames: u64,
    pub full_redraws: u64,
    pub objects_rendered: u64,
    pub objects_culled: u64,
    pub render_errors: u64,
    pub average_frame_ms: f32,
    pub initial_level: QualityLevel,
    pub final_level: QualityLevel,
    pub transitions: Vec<TransitionReport>,
    pub rollbacks: u32,
    pub pool_adjustments: u64,
    pub statistics: QualityStatistics,
}

impl HeadlessReport {
    pub fn new(initial_level: QualityLevel) -> Self {
        Self {
            elapsed_frames: 0,
            elapsed_ms: 0,
            rendered_frames: 0,
            skipped_frames: 0,
            full_redraws: 0,
            objects_rendered: 0,
            objects_culled: 0,
            render_errors: 0,
            average_frame_ms: 0.0,
            initial_level,
            final_level: initial_level,
            transitions: Vec::new(),
            rollbacks: 0,
            pool_adjustments: 0,
            statistics: QualityStatistics::default(),
        }
    }

    /// Fold one frame into the totals
    pub fn record_frame(&mut self, frame: &crate::runtime::FrameReport) {
        let n = self.elapsed_frames as f32;
        self.average_frame_ms = (self.average_frame_ms * n + frame.frame_time_ms) / (n + 1.0);
        self.elapsed_frames += 1;

        let render = &frame.render;
        if render.skipped {
            self.skipped_frames += 1;
        } else {
            self.rendered_frames += 1;
        }
        if render.full_redraw {
            self.full_redraws += 1;
        }
        self.objects_rendered += render.rendered_objects as u64;
        self.objects_culled += render.culled_objects as u64;
        self.render_errors += render.render_errors as u64;
        self.pool_adjustments += frame.pool_adjustments.len() as u64;
        self.final_level = frame.quality_level;

        for event in &frame.quality_events {
            match event {
                QualityEvent::TransitionComplete(transition) => self.transitions.push(*transition),
                QualityEvent::Rollback { .. } => self.rollbacks += 1,
                _ => {}
            }
        }
    }

    pub fn average_fps(&self) -> f32 {
        if self.average_frame_ms > 0.0 {
            1000.0 / self.average_frame_ms
        } else {
            0.0
        }
    }

    /// The JSON document written by [`write_to_path`](Self::write_to_path),
    /// grouped into frame, object, quality and pool sections
    pub fn to_document(&self) -> serde_json::Value {
        json!({
            "frames": {
                "elapsed": self.elapsed_frames,
                "elapsed_ms": self.elapsed_ms,
                "rendered": self.rendered_frames,
                "skipped": self.skipped_frames,
                "full_redraws": self.full_redraws,
                "average_ms": self.average_frame_ms,
                "average_fps": self.average_fps(),
            },
            "objects": {
                "rendered": self.objects_rendered,
                "culled": self.objects_culled,
                "render_errors": self.render_errors,
            },
            "quality": {
                "initial_level": self.initial_level,
                "final_level": self.final_level,
                "transitions": self.transitions,
                "rollbacks": self.rollbacks,
                "statistics": self.statistics,
            },
            "pools": {
                "adjustments": self.pool_adjustments,
            },
        })
    }

    /// Write the report below the working directory
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            bail!("report path {} must stay inside the working directory", path.display());
        }
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_to_writer(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, &self.to_document())?;
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubble_quality::AdjustmentReason;

    #[test]
    fn test_run_rejects_bad_config() {
        let cfg = HeadlessRunConfig {
            max_frames: 0,
            ..HeadlessRunConfig::default()
        };
        assert!(HeadlessRuntime::run(cfg, |_| 0).is_err());

        let cfg = HeadlessRunConfig {
            pixel_ratio: f32::NAN,
            ..HeadlessRunConfig::default()
        };
        assert!(HeadlessRuntime::run(cfg, |_| 0).is_err());
    }

    #[test]
    fn test_run_accumulates_frame_durations() {
        let cfg = HeadlessRunConfig {
            max_frames: 3,
            ..HeadlessRunConfig::default()
        };
        let mut starts = Vec::new();
        let elapsed = HeadlessRuntime::run(cfg, |ctx| {
            starts.push(ctx.elapsed_ms);
            if ctx.frame_index == 1 {
                40
            } else {
                0
            }
        })
        .unwrap();
        assert_eq!(starts, vec![0, 16, 56]);
        assert_eq!(elapsed, 72);
    }

    #[test]
    fn test_report_paths_must_stay_relative() {
        let report = HeadlessReport::new(QualityLevel::High);
        assert!(report.write_to_path(Path::new("/tmp/report.json")).is_err());
        assert!(report.write_to_path(Path::new("../report.json")).is_err());
        assert!(report.write_to_path(Path::new("out/../../report.json")).is_err());
    }

    #[test]
    fn test_report_json_sections() {
        let mut report = HeadlessReport::new(QualityLevel::High);
        report.final_level = QualityLevel::Medium;
        report.elapsed_frames = 4;
        report.average_frame_ms = 25.0;
        report.transitions.push(TransitionReport {
            success: true,
            from_level: QualityLevel::High,
            to_level: QualityLevel::Medium,
            duration_ms: 2000,
            reason: AdjustmentReason::FpsBelowThreshold,
        });

        let mut out = Vec::new();
        report.write_to_writer(&mut out).unwrap();
        assert!(out.ends_with(b"\n"));
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["frames"]["elapsed"], 4);
        assert_eq!(json["frames"]["average_fps"], 40.0);
        assert_eq!(json["quality"]["initial_level"], "high");
        assert_eq!(json["quality"]["final_level"], "medium");
        assert_eq!(json["quality"]["transitions"][0]["to_level"], "medium");
        assert_eq!(json["pools"]["adjustments"], 0);
    }
}
