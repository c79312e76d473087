//! End-to-end quality adjustment scenarios driven by a simulated clock

use bubble_core::{QualityConfig, ValidationConfig};
use bubble_quality::{
    AdaptiveQualityController, AdjustmentReason, ControllerPhase, MemoryStore, QualityEvent,
    QualityLevel, PREFERENCES_KEY,
};

const SAMPLE_MS: u64 = 500;

/// Ticks the controller every sample interval, feeding frames at `fps`
struct Clock {
    now: u64,
}

impl Clock {
    fn run(&mut self, controller: &mut AdaptiveQualityController, fps: f32, until: u64) {
        while self.now <= until {
            for _ in 0..30 {
                controller.record_frame(1000.0 / fps);
            }
            controller.tick(self.now);
            self.now += SAMPLE_MS;
        }
    }
}

fn controller(config: QualityConfig) -> AdaptiveQualityController {
    AdaptiveQualityController::new(config, Box::new(MemoryStore::new()))
}

#[test]
fn sustained_low_fps_recommends_one_step_down() {
    let mut quality = controller(QualityConfig {
        auto_adjustment: false,
        ..QualityConfig::default()
    });
    let mut clock = Clock { now: 0 };
    clock.run(&mut quality, 42.0, 1_000);

    let decision = quality.analyze();
    assert!(decision.needs_adjustment);
    assert_eq!(decision.recommended_level, QualityLevel::Medium);
    assert_eq!(decision.reason, AdjustmentReason::PerformanceDrop);
    // Auto adjustment off: nothing applied
    assert_eq!(quality.current_level(), QualityLevel::High);
}

#[test]
fn downgrade_validates_then_stabilizes() {
    let mut quality = controller(QualityConfig::default());
    let mut clock = Clock { now: 0 };

    clock.run(&mut quality, 40.0, 1_000);
    assert_eq!(quality.phase(), ControllerPhase::Transitioning);
    assert_eq!(quality.target_level(), QualityLevel::Medium);

    // Medium runs comfortably
    clock.run(&mut quality, 58.0, 3_000);
    assert_eq!(quality.current_level(), QualityLevel::Medium);
    assert_eq!(quality.phase(), ControllerPhase::Validating);
    assert_eq!(quality.settings(), QualityLevel::Medium.settings());

    clock.run(&mut quality, 58.0, 6_000);
    assert_eq!(quality.phase(), ControllerPhase::Stabilizing);

    clock.run(&mut quality, 58.0, 11_000);
    assert_eq!(quality.phase(), ControllerPhase::Stable);
    assert_eq!(quality.current_level(), QualityLevel::Medium);

    let stats = quality.statistics();
    assert_eq!(stats.automatic_adjustments, 1);
    assert_eq!(stats.rollbacks, 0);

    let stored = quality.store().load(PREFERENCES_KEY).unwrap().unwrap();
    assert!(stored.contains("\"lastQualityLevel\":\"medium\""));
}

#[test]
fn failed_validation_rolls_back() {
    let mut quality = controller(QualityConfig::default());
    let mut clock = Clock { now: 0 };

    // Still slow after the downgrade
    clock.run(&mut quality, 40.0, 6_000);
    assert_eq!(quality.current_level(), QualityLevel::High);
    assert_eq!(quality.phase(), ControllerPhase::Stable);
    assert_eq!(quality.statistics().rollbacks, 1);

    let events = quality.drain_events();
    assert!(events.contains(&QualityEvent::Rollback {
        from: QualityLevel::Medium,
        to: QualityLevel::High,
        reason: AdjustmentReason::FpsBelowThreshold,
    }));

    // Cooldown holds the level even though fps stays low
    clock.run(&mut quality, 40.0, 20_000);
    assert_eq!(quality.current_level(), QualityLevel::High);
    assert_eq!(quality.phase(), ControllerPhase::Stable);
}

#[test]
fn repeated_rollbacks_disable_auto_adjustment() {
    let mut quality = controller(QualityConfig {
        validation: ValidationConfig {
            max_rollbacks: 1,
            ..ValidationConfig::default()
        },
        ..QualityConfig::default()
    });
    let mut clock = Clock { now: 0 };
    clock.run(&mut quality, 40.0, 6_000);

    assert!(!quality.config().auto_adjustment);
    let events = quality.drain_events();
    assert!(events.contains(&QualityEvent::AutoAdjustmentDisabled { rollback_count: 1 }));

    quality.set_auto_adjustment(true);
    assert!(quality.status(clock.now).auto_adjustment);
    assert_eq!(quality.status(clock.now).rollback_count, 0);
}

#[test]
fn transition_eases_particles_before_render_scale() {
    let mut quality = controller(QualityConfig::default());
    quality.set_quality_level(QualityLevel::Minimal, true, 0);

    // One third of the eased transition: dynamic settings done, critical untouched
    quality.advance(1_000);
    let mid = quality.settings();
    assert!(mid.particle_density < QualityLevel::High.settings().particle_density);
    assert_eq!(mid.render_scale, QualityLevel::High.settings().render_scale);
    assert_eq!(quality.phase(), ControllerPhase::Transitioning);

    quality.advance(2_000);
    assert_eq!(quality.settings(), QualityLevel::Minimal.settings());
    assert_eq!(quality.phase(), ControllerPhase::Stabilizing);
}
