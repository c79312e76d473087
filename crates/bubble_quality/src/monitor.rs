//! Frame-time monitoring

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Samples averaged by [`PerformanceOptimizer::averages`]
const AVERAGE_WINDOW: usize = 10;
/// Samples used for the trend slope
const TREND_WINDOW: usize = 5;
/// Neutral memory pressure when the host cannot report one
const NEUTRAL_MEMORY_PRESSURE: f32 = 0.5;
const DEFAULT_FRAME_MS: f32 = 1000.0 / 60.0;

/// One aggregated measurement taken at a sample interval
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub timestamp_ms: u64,
    pub fps: f32,
    pub frame_time_ms: f32,
    /// 1.0 for perfectly even frame times, falling toward 0.0 with jitter
    pub stability: f32,
    /// 0.0 (no pressure) to 1.0
    pub memory_pressure: f32,
}

impl Default for PerformanceSample {
    fn default() -> Self {
        Self {
            timestamp_ms: 0,
            fps: 60.0,
            frame_time_ms: DEFAULT_FRAME_MS,
            stability: 1.0,
            memory_pressure: NEUTRAL_MEMORY_PRESSURE,
        }
    }
}

/// Mean values over the most recent samples
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PerformanceAverages {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub stability: f32,
    pub memory_pressure: f32,
}

/// Collects frame times and turns them into periodic samples
#[derive(Debug)]
pub struct PerformanceOptimizer {
    pending: Vec<f32>,
    history: VecDeque<PerformanceSample>,
    history_size: usize,
    memory_pressure: Option<f32>,
}

impl PerformanceOptimizer {
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            pending: Vec::new(),
            history: VecDeque::with_capacity(history_size),
            history_size,
            memory_pressure: None,
        }
    }

    /// Record one frame's duration. Non-finite or non-positive times are ignored.
    pub fn record_frame(&mut self, frame_ms: f32) {
        if frame_ms.is_finite() && frame_ms > 0.0 {
            self.pending.push(frame_ms);
        } else {
            tracing::trace!(frame_ms, "ignoring invalid frame time");
        }
    }

    /// Host-reported memory pressure; `None` when unavailable
    pub fn set_memory_pressure(&mut self, pressure: Option<f32>) {
        self.memory_pressure = pressure.filter(|p| p.is_finite()).map(|p| p.clamp(0.0, 1.0));
    }

    /// Frames recorded since the last sample
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Aggregate the frames recorded since the previous sample.
    ///
    /// With no new frames the previous frame time is carried forward.
    pub fn sample(&mut self, now_ms: u64) -> PerformanceSample {
        let (frame_time_ms, stability) = if self.pending.is_empty() {
            let last = self.latest().unwrap_or_default();
            (last.frame_time_ms, last.stability)
        } else {
            (mean(&self.pending), stability(&self.pending))
        };
        self.pending.clear();

        let sample = PerformanceSample {
            timestamp_ms: now_ms,
            fps: 1000.0 / frame_time_ms,
            frame_time_ms,
            stability,
            memory_pressure: self.memory_pressure.unwrap_or(NEUTRAL_MEMORY_PRESSURE),
        };
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(sample);
        sample
    }

    pub fn latest(&self) -> Option<PerformanceSample> {
        self.history.back().copied()
    }

    pub fn history(&self) -> &VecDeque<PerformanceSample> {
        &self.history
    }

    /// The newest `count` samples, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &PerformanceSample> {
        self.history.iter().skip(self.history.len().saturating_sub(count))
    }

    pub fn averages(&self) -> Option<PerformanceAverages> {
        let window: Vec<&PerformanceSample> = self.recent(AVERAGE_WINDOW).collect();
        if window.is_empty() {
            return None;
        }
        let n = window.len() as f32;
        let sum = |f: fn(&PerformanceSample) -> f32| window.iter().map(|s| f(*s)).sum::<f32>() / n;
        Some(PerformanceAverages {
            fps: sum(|s| s.fps),
            frame_time_ms: sum(|s| s.frame_time_ms),
            stability: sum(|s| s.stability),
            memory_pressure: sum(|s| s.memory_pressure),
        })
    }

    /// Mean fps of samples taken at or after `since_ms`
    pub fn average_fps_since(&self, since_ms: u64) -> Option<f32> {
        let fps: Vec<f32> = self
            .history
            .iter()
            .filter(|s| s.timestamp_ms >= since_ms)
            .map(|s| s.fps)
            .collect();
        (!fps.is_empty()).then(|| mean(&fps))
    }

    /// Mean stability of samples taken at or after `since_ms`
    pub fn average_stability_since(&self, since_ms: u64) -> Option<f32> {
        let values: Vec<f32> = self
            .history
            .iter()
            .filter(|s| s.timestamp_ms >= since_ms)
            .map(|s| s.stability)
            .collect();
        (!values.is_empty()).then(|| mean(&values))
    }

    /// Direction of recent fps in `0.0..=1.0`; 0.5 is flat.
    ///
    /// Least-squares slope over the last five samples, in fps per sample,
    /// scaled down by five and clamped to ±2. Fewer than three samples
    /// read as flat.
    pub fn trend_score(&self) -> f32 {
        let fps: Vec<f32> = self.recent(TREND_WINDOW).map(|s| s.fps).collect();
        if fps.len() < 3 {
            return 0.5;
        }
        let n = fps.len() as f32;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = mean(&fps);
        let (mut num, mut den) = (0.0, 0.0);
        for (i, y) in fps.iter().enumerate() {
            let dx = i as f32 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        let slope = if den > 0.0 { num / den } else { 0.0 };
        let normalized = (slope / 5.0).clamp(-2.0, 2.0);
        (0.5 + normalized * 0.25).clamp(0.0, 1.0)
    }

    pub fn set_history_size(&mut self, history_size: usize) {
        self.history_size = history_size.max(1);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.history.clear();
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// One minus the coefficient of variation, clamped to `0.0..=1.0`
fn stability(frame_times: &[f32]) -> f32 {
    if frame_times.len() < 2 {
        return 1.0;
    }
    let avg = mean(frame_times);
    let variance =
        frame_times.iter().map(|t| (t - avg).powi(2)).sum::<f32>() / frame_times.len() as f32;
    (1.0 - (variance.sqrt() / avg).clamp(0.0, 1.0)).clamp(0.0, 1.0)
}
