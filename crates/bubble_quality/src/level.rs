//! Quality levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bubble_core::BubbleError;

use crate::settings::QualitySettings;

/// Discrete rendering quality tiers, ordered from cheapest to richest
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Minimal,
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 5] = [
        QualityLevel::Minimal,
        QualityLevel::Low,
        QualityLevel::Medium,
        QualityLevel::High,
        QualityLevel::Ultra,
    ];

    /// Position in [`QualityLevel::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Minimal => "minimal",
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
        }
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Minimal => "Minimal",
            QualityLevel::Low => "Low",
            QualityLevel::Medium => "Medium",
            QualityLevel::High => "High",
            QualityLevel::Ultra => "Ultra",
        }
    }

    pub fn target_fps(self) -> f32 {
        match self {
            QualityLevel::Minimal => 30.0,
            QualityLevel::Low => 50.0,
            QualityLevel::Medium | QualityLevel::High | QualityLevel::Ultra => 60.0,
        }
    }

    /// Sustained frame rate below which the level is too expensive
    pub fn min_fps(self) -> f32 {
        match self {
            QualityLevel::Minimal => 25.0,
            QualityLevel::Low => 35.0,
            QualityLevel::Medium => 45.0,
            QualityLevel::High => 50.0,
            QualityLevel::Ultra => 55.0,
        }
    }

    pub fn settings(self) -> QualitySettings {
        QualitySettings::preset(self)
    }

    /// The next richer level, if any
    pub fn higher(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The next cheaper level, if any
    pub fn lower(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLevel {
    type Err = BubbleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| BubbleError::InvalidQualityLevel(s.to_string()))
    }
}
