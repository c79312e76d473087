//! Staged transitions between quality levels

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::level::QualityLevel;
use crate::settings::{QualitySettings, Setting, SettingGroup};

/// Easing curve for transition progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    #[default]
    EaseInOutQuad,
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// An in-flight move from one level's settings to another's.
///
/// The eased progress is split into equal thirds, one per [`SettingGroup`];
/// each group's settings move only during their third.
#[derive(Clone, Debug)]
pub struct Transition {
    from_level: QualityLevel,
    to_level: QualityLevel,
    from: QualitySettings,
    to: QualitySettings,
    groups: [SmallVec<[Setting; 4]>; 3],
    started_at_ms: u64,
    duration_ms: u64,
    easing: Easing,
}

impl Transition {
    /// Start from `from` (which may be a partially applied state) toward
    /// `to_level`'s preset
    pub fn new(
        from_level: QualityLevel,
        from: QualitySettings,
        to_level: QualityLevel,
        started_at_ms: u64,
        duration_ms: u64,
    ) -> Self {
        let to = to_level.settings();
        let mut groups: [SmallVec<[Setting; 4]>; 3] = Default::default();
        for setting in from.changed(&to) {
            groups[setting.group().index()].push(setting);
        }
        Self {
            from_level,
            to_level,
            from,
            to,
            groups,
            started_at_ms,
            duration_ms,
            easing: Easing::default(),
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn from_level(&self) -> QualityLevel {
        self.from_level
    }

    pub fn to_level(&self) -> QualityLevel {
        self.to_level
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    /// Linear progress in `0.0..=1.0`
    pub fn progress(&self, now_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms(now_ms) as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    /// Settings to apply at `now_ms`
    pub fn settings_at(&self, now_ms: u64) -> QualitySettings {
        let eased = self.easing.apply(self.progress(now_ms));
        let mut settings = self.from;
        for group in SettingGroup::ALL {
            let t = group_progress(eased, group.index(), SettingGroup::ALL.len());
            for setting in &self.groups[group.index()] {
                settings.blend(&self.from, &self.to, *setting, t);
            }
        }
        settings
    }

    /// Settings in `group` that this transition changes
    pub fn changes(&self, group: SettingGroup) -> &[Setting] {
        &self.groups[group.index()]
    }
}

/// Progress of stage `index` out of `count` equal stages
fn group_progress(total: f32, index: usize, count: usize) -> f32 {
    let span = 1.0 / count as f32;
    let start = index as f32 * span;
    ((total - start) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_in_out_quad() {
        let easing = Easing::EaseInOutQuad;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(1.0), 1.0);
        assert!((easing.apply(0.25) - 0.125).abs() < 1e-6);
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((easing.apply(0.75) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_group_progress() {
        assert_eq!(group_progress(0.0, 0, 3), 0.0);
        assert!((group_progress(1.0 / 6.0, 0, 3) - 0.5).abs() < 1e-5);
        assert_eq!(group_progress(0.5, 0, 3), 1.0);
        assert_eq!(group_progress(0.2, 2, 3), 0.0);
        assert_eq!(group_progress(1.0, 2, 3), 1.0);
    }

    #[test]
    fn test_dynamic_settings_move_before_critical() {
        let transition = Transition::new(
            QualityLevel::High,
            QualityLevel::High.settings(),
            QualityLevel::Low,
            1_000,
            3_000,
        )
        .with_easing(Easing::Linear);

        assert!(transition.changes(SettingGroup::Dynamic).contains(&Setting::ParticleDensity));
        assert!(transition.changes(SettingGroup::Critical).contains(&Setting::RenderScale));

        // End of the dynamic stage
        let early = transition.settings_at(2_000);
        assert!((early.particle_density - 0.5).abs() < 1e-5);
        assert!(!early.post_processing);
        assert_eq!(early.render_scale, 1.0);

        let done = transition.settings_at(4_000);
        assert_eq!(done, QualityLevel::Low.settings());
        assert!(transition.is_complete(4_000));
        assert!(!transition.is_complete(3_999));
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let transition = Transition::new(
            QualityLevel::Medium,
            QualityLevel::Medium.settings(),
            QualityLevel::Ultra,
            50,
            0,
        );
        assert!(transition.is_complete(50));
        assert_eq!(transition.settings_at(50), QualityLevel::Ultra.settings());
    }

    #[test]
    fn test_before_start_is_source_settings() {
        let from = QualityLevel::Ultra.settings();
        let transition = Transition::new(QualityLevel::Ultra, from, QualityLevel::Minimal, 100, 1_000);
        assert_eq!(transition.settings_at(0), from);
        assert_eq!(transition.elapsed_ms(0), 0);
    }
}
