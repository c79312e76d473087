//! Pipeline configuration (bubble.toml)
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BubbleError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BubbleConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

impl BubbleConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: BubbleConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.canvas;
        if !(c.base_width > 0.0 && c.base_height > 0.0) {
            return Err(BubbleError::InvalidConfig(format!(
                "base resolution must be positive, got {}x{}",
                c.base_width, c.base_height
            )));
        }
        if c.min_font_size > c.max_font_size || c.min_line_width > c.max_line_width {
            return Err(BubbleError::InvalidConfig(
                "font and line width clamps must have min <= max".into(),
            ));
        }
        if c.cache_capacity == 0 {
            return Err(BubbleError::InvalidConfig(
                "cache_capacity must be at least 1".into(),
            ));
        }
        if self.render.max_dirty_regions == 0 {
            return Err(BubbleError::InvalidConfig(
                "max_dirty_regions must be at least 1".into(),
            ));
        }
        let p = &self.pool;
        if p.min_size > p.max_size {
            return Err(BubbleError::InvalidConfig(format!(
                "pool min_size {} exceeds max_size {}",
                p.min_size, p.max_size
            )));
        }
        for (name, value) in [
            ("shrink_efficiency", p.shrink_efficiency),
            ("grow_efficiency", p.grow_efficiency),
            ("rollback_threshold", self.quality.validation.rollback_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BubbleError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }
        if self.quality.history_size == 0 || self.quality.low_sample_count == 0 {
            return Err(BubbleError::InvalidConfig(
                "history_size and low_sample_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Base resolution and scaling clamps
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub base_width: f32,
    pub base_height: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub min_line_width: f32,
    pub max_line_width: f32,
    /// Entries kept in the conversion cache
    pub cache_capacity: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_width: 800.0,
            base_height: 600.0,
            min_font_size: 8.0,
            max_font_size: 72.0,
            min_line_width: 0.5,
            max_line_width: 20.0,
            cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Extra pixels around the viewport that still count as visible
    pub cull_margin: f32,
    /// Above this many dirty regions the frame redraws the whole canvas
    pub max_dirty_regions: usize,
    pub default_layer: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cull_margin: 50.0,
            max_dirty_regions: 10,
            default_layer: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_size: usize,
    pub max_size: usize,
    /// Pools reusing less than this share of requests get shrunk
    pub shrink_efficiency: f32,
    /// Pools reusing more than this share (and running dry) get grown
    pub grow_efficiency: f32,
    pub optimize_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 10,
            max_size: 100,
            shrink_efficiency: 0.5,
            grow_efficiency: 0.9,
            optimize_interval_ms: 10_000,
        }
    }
}

/// How eagerly the quality controller reacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl Sensitivity {
    /// Fractional margin applied before an upgrade is considered
    pub fn hysteresis(self) -> f32 {
        match self {
            Sensitivity::Conservative => 0.15,
            Sensitivity::Balanced => 0.1,
            Sensitivity::Aggressive => 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QualityConfig {
    pub auto_adjustment: bool,
    pub sensitivity: Sensitivity,
    pub transition_duration_ms: u64,
    pub stabilization_time_ms: u64,
    pub sample_interval_ms: u64,
    pub history_size: usize,
    /// Consecutive samples under `min_fps` before a downgrade
    pub low_sample_count: usize,
    /// Consecutive samples over the next level's target before an upgrade
    pub upgrade_sample_count: usize,
    /// Level used when nothing is stored and no detection ran
    pub starting_level: Option<String>,
    pub validation: ValidationConfig,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            auto_adjustment: true,
            sensitivity: Sensitivity::Balanced,
            transition_duration_ms: 2_000,
            stabilization_time_ms: 5_000,
            sample_interval_ms: 500,
            history_size: 60,
            low_sample_count: 3,
            upgrade_sample_count: 5,
            starting_level: None,
            validation: ValidationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub period_ms: u64,
    /// Measured/expected ratio under which a new level is rolled back
    pub rollback_threshold: f32,
    pub max_rollbacks: u32,
    pub rollback_cooldown_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_ms: 3_000,
            rollback_threshold: 0.8,
            max_rollbacks: 3,
            rollback_cooldown_ms: 30_000,
        }
    }
}
