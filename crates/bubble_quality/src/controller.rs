//! Adaptive quality control
//!
//! The controller samples the frame monitor on a fixed interval and moves
//! between quality levels one step at a time. A change runs through four
//! phases:
//!
//! ```text
//! Stable -> Transitioning -> Validating -> Stabilizing -> Stable
//! ```
//!
//! Automatic changes are validated once the new level has been live for the
//! validation period; a level that under-performs is rolled back to the
//! previous one. Manual changes skip validation.
//!
//! Time is passed in explicitly as milliseconds so hosts and tests control
//! the clock.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use bubble_core::{QualityConfig, Result};

use crate::level::QualityLevel;
use crate::monitor::{PerformanceOptimizer, PerformanceSample};
use crate::settings::QualitySettings;
use crate::store::{
    load_json, save_json, PreferenceStore, UserPreferences, PREFERENCES_KEY, STATISTICS_KEY,
};
use crate::transition::Transition;

/// Stability a validated level is expected to hold
const EXPECTED_STABILITY: f32 = 0.8;

const FPS_WEIGHT: f32 = 0.4;
const STABILITY_WEIGHT: f32 = 0.3;
const MEMORY_WEIGHT: f32 = 0.2;
const TREND_WEIGHT: f32 = 0.1;

/// Where the controller is in an adjustment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    #[default]
    Stable,
    Transitioning,
    Validating,
    Stabilizing,
}

/// Why a level change happened or was recommended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// No change needed
    Stable,
    PerformanceDrop,
    PerformanceHeadroom,
    CriticalWarning,
    UserRequest,
    FpsBelowThreshold,
    StabilityBelowThreshold,
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AdjustmentReason::Stable => "stable",
            AdjustmentReason::PerformanceDrop => "performance drop",
            AdjustmentReason::PerformanceHeadroom => "performance headroom",
            AdjustmentReason::CriticalWarning => "critical performance warning",
            AdjustmentReason::UserRequest => "user request",
            AdjustmentReason::FpsBelowThreshold => "fps below validation threshold",
            AdjustmentReason::StabilityBelowThreshold => "stability below validation threshold",
        };
        f.write_str(text)
    }
}

/// Normalized scores behind a decision, each in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DecisionScores {
    pub fps: f32,
    pub stability: f32,
    pub memory: f32,
    pub trend: f32,
    /// Weighted blend of the other four
    pub overall: f32,
}

/// Result of [`AdaptiveQualityController::analyze`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QualityDecision {
    pub needs_adjustment: bool,
    pub recommended_level: QualityLevel,
    pub reason: AdjustmentReason,
    pub scores: DecisionScores,
}

/// Outcome of a finished or abandoned transition
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub success: bool,
    pub from_level: QualityLevel,
    pub to_level: QualityLevel,
    pub duration_ms: u64,
    pub reason: AdjustmentReason,
}

/// Notifications drained by the host with [`AdaptiveQualityController::drain_events`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QualityEvent {
    /// A level's settings are now fully applied
    QualityChanged {
        level: QualityLevel,
        settings: QualitySettings,
    },
    TransitionComplete(TransitionReport),
    Rollback {
        from: QualityLevel,
        to: QualityLevel,
        reason: AdjustmentReason,
    },
    AutoAdjustmentDisabled { rollback_count: u32 },
}

/// Severity of a host performance warning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceWarning {
    Minor,
    Critical,
}

/// Snapshot for diagnostics and UI
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QualityStatus {
    pub current_level: QualityLevel,
    pub target_level: QualityLevel,
    pub phase: ControllerPhase,
    pub transition_progress: f32,
    pub auto_adjustment: bool,
    pub user_override: bool,
    pub rollback_count: u32,
    pub settings: QualitySettings,
    pub latest_sample: Option<PerformanceSample>,
}

/// Lifetime counters, persisted across sessions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityStatistics {
    pub total_adjustments: u32,
    pub automatic_adjustments: u32,
    pub user_overrides: u32,
    pub rollbacks: u32,
    /// Times each level became active
    pub level_distribution: BTreeMap<QualityLevel, u32>,
    /// Mean milliseconds spent at each level per visit
    pub average_time_per_level: BTreeMap<QualityLevel, f64>,
    level_exits: BTreeMap<QualityLevel, u32>,
}

impl QualityStatistics {
    fn entered(&mut self, level: QualityLevel) {
        *self.level_distribution.entry(level).or_insert(0) += 1;
    }

    fn exited(&mut self, level: QualityLevel, duration_ms: u64) {
        let exits = self.level_exits.entry(level).or_insert(0);
        *exits += 1;
        let n = f64::from(*exits);
        let average = self.average_time_per_level.entry(level).or_insert(0.0);
        *average += (duration_ms as f64 - *average) / n;
    }
}

#[derive(Clone, Copy, Debug)]
struct Validation {
    started_at_ms: u64,
    expected_fps: f32,
}

/// Chooses and applies quality levels from measured frame performance
pub struct AdaptiveQualityController {
    config: QualityConfig,
    store: Box<dyn PreferenceStore>,
    monitor: PerformanceOptimizer,
    current: QualityLevel,
    target: QualityLevel,
    previous: QualityLevel,
    settings: QualitySettings,
    phase: ControllerPhase,
    transition: Option<Transition>,
    transition_reason: AdjustmentReason,
    transition_automatic: bool,
    validation: Option<Validation>,
    stabilizing_since_ms: u64,
    /// No automatic evaluation before this instant
    cooldown_until_ms: u64,
    level_entered_ms: u64,
    rollback_count: u32,
    user_override: bool,
    statistics: QualityStatistics,
    events: Vec<QualityEvent>,
    destroyed: bool,
}

impl AdaptiveQualityController {
    /// Create a controller, restoring stored preferences.
    ///
    /// The starting level is the stored level, else `config.starting_level`,
    /// else [`QualityLevel::default`].
    pub fn new(config: QualityConfig, store: Box<dyn PreferenceStore>) -> Self {
        let configured = Self::configured_level(&config);
        Self::with_level(config, store, configured.unwrap_or_default())
    }

    /// The parsed `starting_level`; an unknown name is logged and ignored
    pub fn configured_level(config: &QualityConfig) -> Option<QualityLevel> {
        config.starting_level.as_deref().and_then(|name| {
            QualityLevel::from_str(name)
                .map_err(|err| tracing::warn!(error = %err, "ignoring configured starting level"))
                .ok()
        })
    }

    /// Like [`new`](Self::new) with an explicit fallback level, for example
    /// one from [`crate::detect_optimal_level`]. A stored level still wins.
    pub fn with_level(
        mut config: QualityConfig,
        store: Box<dyn PreferenceStore>,
        fallback: QualityLevel,
    ) -> Self {
        let prefs: UserPreferences = load_json(store.as_ref(), PREFERENCES_KEY).unwrap_or_default();
        let statistics: QualityStatistics =
            load_json(store.as_ref(), STATISTICS_KEY).unwrap_or_default();
        if let Some(enabled) = prefs.auto_adjustment_enabled {
            config.auto_adjustment = enabled;
        }
        let level = prefs.last_quality_level.unwrap_or(fallback);
        tracing::debug!(%level, auto = config.auto_adjustment, "quality controller created");

        let mut controller = Self {
            monitor: PerformanceOptimizer::new(config.history_size),
            config,
            store,
            current: level,
            target: level,
            previous: level,
            settings: level.settings(),
            phase: ControllerPhase::Stable,
            transition: None,
            transition_reason: AdjustmentReason::Stable,
            transition_automatic: false,
            validation: None,
            stabilizing_since_ms: 0,
            cooldown_until_ms: 0,
            level_entered_ms: 0,
            rollback_count: 0,
            user_override: false,
            statistics,
            events: Vec::new(),
            destroyed: false,
        };
        controller.statistics.entered(level);
        controller
    }

    /// Record one frame's duration
    pub fn record_frame(&mut self, frame_ms: f32) {
        self.monitor.record_frame(frame_ms);
    }

    pub fn monitor(&self) -> &PerformanceOptimizer {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut PerformanceOptimizer {
        &mut self.monitor
    }

    /// Sample interval tick: take a sample, advance any transition, then
    /// evaluate
    pub fn tick(&mut self, now_ms: u64) {
        if self.destroyed {
            return;
        }
        self.monitor.sample(now_ms);
        self.advance(now_ms);
        self.evaluate(now_ms);
    }

    /// Step an in-flight transition. Call once per frame for smooth changes.
    pub fn advance(&mut self, now_ms: u64) {
        if self.destroyed {
            return;
        }
        let Some(transition) = &self.transition else {
            return;
        };
        self.settings = transition.settings_at(now_ms);
        if transition.is_complete(now_ms) {
            self.complete_transition(now_ms);
        }
    }

    /// Run one evaluation without taking a new sample
    pub fn force_evaluation(&mut self, now_ms: u64) {
        if !self.destroyed {
            self.evaluate(now_ms);
        }
    }

    fn evaluate(&mut self, now_ms: u64) {
        match self.phase {
            ControllerPhase::Transitioning => return,
            ControllerPhase::Validating => {
                self.check_validation(now_ms);
                return;
            }
            ControllerPhase::Stabilizing => {
                let since = now_ms.saturating_sub(self.stabilizing_since_ms);
                if since >= self.config.stabilization_time_ms {
                    tracing::debug!(level = %self.current, "quality stabilized");
                    self.phase = ControllerPhase::Stable;
                }
                return;
            }
            ControllerPhase::Stable => {}
        }
        if !self.config.auto_adjustment || self.user_override || now_ms < self.cooldown_until_ms {
            return;
        }

        let decision = self.analyze();
        if decision.needs_adjustment {
            self.begin_transition(decision.recommended_level, decision.reason, true, now_ms);
        }
    }

    /// Decide whether the current level should change.
    ///
    /// Downgrades when the last `low_sample_count` samples are all under the
    /// current level's minimum fps. Upgrades when the last
    /// `upgrade_sample_count` samples all clear the next level's target fps
    /// plus the sensitivity's hysteresis.
    pub fn analyze(&self) -> QualityDecision {
        let scores = self.scores();
        let mut decision = QualityDecision {
            needs_adjustment: false,
            recommended_level: self.current,
            reason: AdjustmentReason::Stable,
            scores,
        };

        let history = self.monitor.history();
        let low = self.config.low_sample_count.max(1);
        if let Some(lower) = self.current.lower() {
            let min_fps = self.current.min_fps();
            if history.len() >= low && self.monitor.recent(low).all(|s| s.fps < min_fps) {
                decision.needs_adjustment = true;
                decision.recommended_level = lower;
                decision.reason = AdjustmentReason::PerformanceDrop;
                return decision;
            }
        }

        let high = self.config.upgrade_sample_count.max(1);
        if let Some(higher) = self.current.higher() {
            let threshold = higher.target_fps() * (1.0 + self.config.sensitivity.hysteresis());
            if history.len() >= high && self.monitor.recent(high).all(|s| s.fps > threshold) {
                decision.needs_adjustment = true;
                decision.recommended_level = higher;
                decision.reason = AdjustmentReason::PerformanceHeadroom;
            }
        }
        decision
    }

    fn scores(&self) -> DecisionScores {
        let latest = self.monitor.latest().unwrap_or_default();
        let fps = (latest.fps / self.current.target_fps()).clamp(0.0, 1.0);
        let stability = latest.stability.clamp(0.0, 1.0);
        let memory = (1.0 - latest.memory_pressure).clamp(0.0, 1.0);
        let trend = self.monitor.trend_score();
        DecisionScores {
            fps,
            stability,
            memory,
            trend,
            overall: fps * FPS_WEIGHT
                + stability * STABILITY_WEIGHT
                + memory * MEMORY_WEIGHT
                + trend * TREND_WEIGHT,
        }
    }

    fn begin_transition(
        &mut self,
        level: QualityLevel,
        reason: AdjustmentReason,
        automatic: bool,
        now_ms: u64,
    ) {
        self.statistics.total_adjustments += 1;
        if automatic {
            self.statistics.automatic_adjustments += 1;
        }
        tracing::info!(from = %self.current, to = %level, %reason, "quality transition started");

        self.previous = self.current;
        self.target = level;
        self.transition = Some(Transition::new(
            self.current,
            self.settings,
            level,
            now_ms,
            self.config.transition_duration_ms,
        ));
        self.transition_reason = reason;
        self.transition_automatic = automatic;
        self.validation = None;
        self.phase = ControllerPhase::Transitioning;
        self.cooldown_until_ms = now_ms.saturating_add(self.config.stabilization_time_ms);
        self.advance(now_ms);
    }

    fn complete_transition(&mut self, now_ms: u64) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        let level = transition.to_level();
        self.enter_level(level, now_ms);

        let report = TransitionReport {
            success: true,
            from_level: transition.from_level(),
            to_level: level,
            duration_ms: transition.elapsed_ms(now_ms),
            reason: self.transition_reason,
        };
        tracing::info!(level = %level, duration_ms = report.duration_ms, "quality transition complete");

        if self.transition_automatic && self.config.validation.enabled {
            self.phase = ControllerPhase::Validating;
            self.validation = Some(Validation {
                started_at_ms: now_ms,
                expected_fps: level.target_fps(),
            });
        } else {
            self.phase = ControllerPhase::Stabilizing;
            self.stabilizing_since_ms = now_ms;
        }

        self.events.push(QualityEvent::QualityChanged {
            level,
            settings: self.settings,
        });
        self.events.push(QualityEvent::TransitionComplete(report));
        self.save_preferences();
    }

    fn check_validation(&mut self, now_ms: u64) {
        let Some(validation) = self.validation else {
            self.phase = ControllerPhase::Stable;
            return;
        };
        if now_ms.saturating_sub(validation.started_at_ms) < self.config.validation.period_ms {
            return;
        }

        let latest = self.monitor.latest().unwrap_or_default();
        let fps = self
            .monitor
            .average_fps_since(validation.started_at_ms)
            .unwrap_or(latest.fps);
        let stability = self
            .monitor
            .average_stability_since(validation.started_at_ms)
            .unwrap_or(latest.stability);
        let threshold = self.config.validation.rollback_threshold;

        let failure = if fps / validation.expected_fps < threshold {
            Some(AdjustmentReason::FpsBelowThreshold)
        } else if stability / EXPECTED_STABILITY < threshold {
            Some(AdjustmentReason::StabilityBelowThreshold)
        } else {
            None
        };

        self.validation = None;
        match failure {
            Some(reason) => self.rollback(reason, now_ms),
            None => {
                tracing::debug!(level = %self.current, fps, stability, "quality level validated");
                self.phase = ControllerPhase::Stabilizing;
                self.stabilizing_since_ms = now_ms;
            }
        }
    }

    /// Return immediately to the previous level
    fn rollback(&mut self, reason: AdjustmentReason, now_ms: u64) {
        let failed = self.current;
        let restored = self.previous;
        self.rollback_count += 1;
        self.statistics.rollbacks += 1;
        tracing::info!(from = %failed, to = %restored, %reason, "rolling back quality level");

        self.transition = None;
        self.target = restored;
        self.enter_level(restored, now_ms);
        self.settings = restored.settings();
        self.phase = ControllerPhase::Stable;
        self.cooldown_until_ms = now_ms.saturating_add(self.config.validation.rollback_cooldown_ms);

        self.events.push(QualityEvent::TransitionComplete(TransitionReport {
            success: false,
            from_level: restored,
            to_level: failed,
            duration_ms: 0,
            reason,
        }));
        self.events.push(QualityEvent::Rollback {
            from: failed,
            to: restored,
            reason,
        });
        self.events.push(QualityEvent::QualityChanged {
            level: restored,
            settings: self.settings,
        });

        if self.rollback_count >= self.config.validation.max_rollbacks {
            tracing::warn!(
                rollbacks = self.rollback_count,
                "too many quality rollbacks, disabling auto adjustment"
            );
            self.config.auto_adjustment = false;
            self.events.push(QualityEvent::AutoAdjustmentDisabled {
                rollback_count: self.rollback_count,
            });
        }
        self.save_preferences();
    }

    fn enter_level(&mut self, level: QualityLevel, now_ms: u64) {
        let spent = now_ms.saturating_sub(self.level_entered_ms);
        self.statistics.exited(self.current, spent);
        self.statistics.entered(level);
        self.current = level;
        self.level_entered_ms = now_ms;
    }

    /// Switch to `level` at the user's request.
    ///
    /// Unless `preserve_auto` is set, auto adjustment is turned off and the
    /// choice holds until [`set_auto_adjustment`](Self::set_auto_adjustment)
    /// re-enables it.
    pub fn set_quality_level(&mut self, level: QualityLevel, preserve_auto: bool, now_ms: u64) {
        if self.destroyed {
            return;
        }
        self.statistics.user_overrides += 1;
        if !preserve_auto {
            self.user_override = true;
            self.config.auto_adjustment = false;
        }
        self.begin_transition(level, AdjustmentReason::UserRequest, false, now_ms);
    }

    /// [`set_quality_level`](Self::set_quality_level) by name
    pub fn request_level(&mut self, name: &str, preserve_auto: bool, now_ms: u64) -> Result<()> {
        let level = QualityLevel::from_str(name)?;
        self.set_quality_level(level, preserve_auto, now_ms);
        Ok(())
    }

    pub fn set_auto_adjustment(&mut self, enabled: bool) {
        self.config.auto_adjustment = enabled;
        self.user_override = !enabled;
        if enabled {
            self.rollback_count = 0;
        }
        tracing::debug!(enabled, "auto adjustment toggled");
        self.save_preferences();
    }

    /// React to a host warning. Critical warnings step down one level at once.
    pub fn handle_performance_warning(&mut self, warning: PerformanceWarning, now_ms: u64) {
        if self.destroyed || !self.config.auto_adjustment || self.user_override {
            return;
        }
        if warning != PerformanceWarning::Critical {
            tracing::debug!(?warning, "performance warning noted");
            return;
        }
        if let Some(lower) = self.target.lower() {
            self.begin_transition(lower, AdjustmentReason::CriticalWarning, true, now_ms);
        }
    }

    /// Replace the tuning parameters
    pub fn configure(&mut self, config: QualityConfig) {
        self.monitor.set_history_size(config.history_size);
        self.config = config;
        self.save_preferences();
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn current_level(&self) -> QualityLevel {
        self.current
    }

    pub fn target_level(&self) -> QualityLevel {
        self.target
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// Settings to render with right now, mid-transition values included
    pub fn settings(&self) -> QualitySettings {
        self.settings
    }

    pub fn status(&self, now_ms: u64) -> QualityStatus {
        QualityStatus {
            current_level: self.current,
            target_level: self.target,
            phase: self.phase,
            transition_progress: self
                .transition
                .as_ref()
                .map_or(0.0, |t| t.progress(now_ms)),
            auto_adjustment: self.config.auto_adjustment,
            user_override: self.user_override,
            rollback_count: self.rollback_count,
            settings: self.settings,
            latest_sample: self.monitor.latest(),
        }
    }

    pub fn statistics(&self) -> &QualityStatistics {
        &self.statistics
    }

    pub fn store(&self) -> &dyn PreferenceStore {
        self.store.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<QualityEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Persist preferences and statistics, then stop reacting to ticks
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.save_preferences();
        save_json(self.store.as_mut(), STATISTICS_KEY, &self.statistics);
        self.monitor.clear();
        self.transition = None;
        self.destroyed = true;
        tracing::debug!("quality controller destroyed");
    }

    fn save_preferences(&mut self) {
        let prefs = UserPreferences {
            last_quality_level: Some(self.current),
            auto_adjustment_enabled: Some(self.config.auto_adjustment),
            last_saved: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_millis() as u64),
        };
        save_json(self.store.as_mut(), PREFERENCES_KEY, &prefs);
    }
}
