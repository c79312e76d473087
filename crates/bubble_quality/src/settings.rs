//! Rendering settings applied for each quality level

use serde::{Deserialize, Serialize};

use crate::level::QualityLevel;

/// Coarse detail tier shared by shadows, effects, textures and reflections
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Disabled,
    Minimal,
    Low,
    Medium,
    High,
    Ultra,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Antialiasing {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "fxaa")]
    Fxaa,
    #[serde(rename = "msaa-2x")]
    Msaa2x,
    #[serde(rename = "msaa-4x")]
    Msaa4x,
}

/// Everything a quality level controls
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    /// Backing-store resolution multiplier
    pub render_scale: f32,
    /// Multiplier on spawned particle and bubble counts
    pub particle_density: f32,
    pub shadow_quality: Tier,
    pub effects_quality: Tier,
    pub antialiasing: Antialiasing,
    pub texture_quality: Tier,
    pub post_processing: bool,
    pub bloom_enabled: bool,
    pub distortion_enabled: bool,
    pub reflection_quality: Tier,
}

impl QualitySettings {
    pub fn preset(level: QualityLevel) -> Self {
        match level {
            QualityLevel::Ultra => Self {
                render_scale: 1.2,
                particle_density: 1.5,
                shadow_quality: Tier::High,
                effects_quality: Tier::Ultra,
                antialiasing: Antialiasing::Msaa4x,
                texture_quality: Tier::Ultra,
                post_processing: true,
                bloom_enabled: true,
                distortion_enabled: true,
                reflection_quality: Tier::High,
            },
            QualityLevel::High => Self {
                render_scale: 1.0,
                particle_density: 1.0,
                shadow_quality: Tier::Medium,
                effects_quality: Tier::High,
                antialiasing: Antialiasing::Msaa2x,
                texture_quality: Tier::High,
                post_processing: true,
                bloom_enabled: true,
                distortion_enabled: false,
                reflection_quality: Tier::Medium,
            },
            QualityLevel::Medium => Self {
                render_scale: 0.9,
                particle_density: 0.8,
                shadow_quality: Tier::Low,
                effects_quality: Tier::Medium,
                antialiasing: Antialiasing::Fxaa,
                texture_quality: Tier::Medium,
                post_processing: true,
                bloom_enabled: false,
                distortion_enabled: false,
                reflection_quality: Tier::Low,
            },
            QualityLevel::Low => Self {
                render_scale: 0.8,
                particle_density: 0.5,
                shadow_quality: Tier::Disabled,
                effects_quality: Tier::Low,
                antialiasing: Antialiasing::None,
                texture_quality: Tier::Low,
                post_processing: false,
                bloom_enabled: false,
                distortion_enabled: false,
                reflection_quality: Tier::Disabled,
            },
            QualityLevel::Minimal => Self {
                render_scale: 0.7,
                particle_density: 0.3,
                shadow_quality: Tier::Disabled,
                effects_quality: Tier::Minimal,
                antialiasing: Antialiasing::None,
                texture_quality: Tier::Minimal,
                post_processing: false,
                bloom_enabled: false,
                distortion_enabled: false,
                reflection_quality: Tier::Disabled,
            },
        }
    }

    /// Settings whose values differ between `self` and `other`
    pub fn changed(&self, other: &QualitySettings) -> Vec<Setting> {
        Setting::ALL
            .into_iter()
            .filter(|setting| !self.same(other, *setting))
            .collect()
    }

    /// Move one setting from `from` toward `to`.
    ///
    /// Numbers interpolate linearly; discrete values switch once `t`
    /// reaches one half.
    pub fn blend(&mut self, from: &QualitySettings, to: &QualitySettings, setting: Setting, t: f32) {
        let t = t.clamp(0.0, 1.0);
        match setting {
            Setting::RenderScale => self.render_scale = lerp(from.render_scale, to.render_scale, t),
            Setting::ParticleDensity => {
                self.particle_density = lerp(from.particle_density, to.particle_density, t)
            }
            Setting::ShadowQuality => {
                self.shadow_quality = step(from.shadow_quality, to.shadow_quality, t)
            }
            Setting::EffectsQuality => {
                self.effects_quality = step(from.effects_quality, to.effects_quality, t)
            }
            Setting::Antialiasing => self.antialiasing = step(from.antialiasing, to.antialiasing, t),
            Setting::TextureQuality => {
                self.texture_quality = step(from.texture_quality, to.texture_quality, t)
            }
            Setting::PostProcessing => {
                self.post_processing = step(from.post_processing, to.post_processing, t)
            }
            Setting::BloomEnabled => {
                self.bloom_enabled = step(from.bloom_enabled, to.bloom_enabled, t)
            }
            Setting::DistortionEnabled => {
                self.distortion_enabled = step(from.distortion_enabled, to.distortion_enabled, t)
            }
            Setting::ReflectionQuality => {
                self.reflection_quality = step(from.reflection_quality, to.reflection_quality, t)
            }
        }
    }

    fn same(&self, other: &QualitySettings, setting: Setting) -> bool {
        match setting {
            Setting::RenderScale => self.render_scale == other.render_scale,
            Setting::ParticleDensity => self.particle_density == other.particle_density,
            Setting::ShadowQuality => self.shadow_quality == other.shadow_quality,
            Setting::EffectsQuality => self.effects_quality == other.effects_quality,
            Setting::Antialiasing => self.antialiasing == other.antialiasing,
            Setting::TextureQuality => self.texture_quality == other.texture_quality,
            Setting::PostProcessing => self.post_processing == other.post_processing,
            Setting::BloomEnabled => self.bloom_enabled == other.bloom_enabled,
            Setting::DistortionEnabled => self.distortion_enabled == other.distortion_enabled,
            Setting::ReflectionQuality => self.reflection_quality == other.reflection_quality,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    if t >= 1.0 {
        b
    } else {
        a + (b - a) * t
    }
}

fn step<T>(a: T, b: T, t: f32) -> T {
    if t < 0.5 {
        a
    } else {
        b
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::preset(QualityLevel::default())
    }
}

/// One field of [`QualitySettings`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Setting {
    RenderScale,
    ParticleDensity,
    ShadowQuality,
    EffectsQuality,
    Antialiasing,
    TextureQuality,
    PostProcessing,
    BloomEnabled,
    DistortionEnabled,
    ReflectionQuality,
}

impl Setting {
    pub const ALL: [Setting; 10] = [
        Setting::RenderScale,
        Setting::ParticleDensity,
        Setting::ShadowQuality,
        Setting::EffectsQuality,
        Setting::Antialiasing,
        Setting::TextureQuality,
        Setting::PostProcessing,
        Setting::BloomEnabled,
        Setting::DistortionEnabled,
        Setting::ReflectionQuality,
    ];

    /// Transition stage this setting changes in
    pub fn group(self) -> SettingGroup {
        match self {
            Setting::ParticleDensity | Setting::EffectsQuality | Setting::PostProcessing => {
                SettingGroup::Dynamic
            }
            Setting::RenderScale | Setting::Antialiasing => SettingGroup::Critical,
            _ => SettingGroup::Other,
        }
    }
}

/// Transition stages, applied in declaration order.
///
/// Cheap-to-notice settings move first; settings that visibly change the
/// whole frame move last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingGroup {
    Dynamic,
    Other,
    Critical,
}

impl SettingGroup {
    pub const ALL: [SettingGroup; 3] =
        [SettingGroup::Dynamic, SettingGroup::Other, SettingGroup::Critical];

    pub fn index(self) -> usize {
        self as usize
    }
}
