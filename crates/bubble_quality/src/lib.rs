//! Bubble Quality
//!
//! Frame-time monitoring and adaptive quality control. The
//! [`AdaptiveQualityController`] watches sampled frame rates and steps the
//! [`QualityLevel`] up or down, easing the new [`QualitySettings`] in over a
//! staged [`Transition`] and rolling back levels that fail validation.
//!
//! ```
//! use bubble_core::QualityConfig;
//! use bubble_quality::{AdaptiveQualityController, MemoryStore, QualityLevel};
//!
//! let mut quality =
//!     AdaptiveQualityController::new(QualityConfig::default(), Box::new(MemoryStore::new()));
//! for (i, now) in [0u64, 500, 1000].into_iter().enumerate() {
//!     for _ in 0..10 {
//!         quality.record_frame(25.0);
//!     }
//!     quality.tick(now);
//!     if i < 2 {
//!         assert_eq!(quality.target_level(), QualityLevel::High);
//!     }
//! }
//! assert_eq!(quality.target_level(), QualityLevel::Medium);
//! ```

pub mod controller;
pub mod device;
pub mod level;
pub mod monitor;
pub mod settings;
pub mod store;
pub mod transition;

pub use controller::{
    AdaptiveQualityController, AdjustmentReason, ControllerPhase, DecisionScores,
    PerformanceWarning, QualityDecision, QualityEvent, QualityStatistics, QualityStatus,
    TransitionReport,
};
pub use device::{detect_optimal_level, DeviceCapabilities};
pub use level::QualityLevel;
pub use monitor::{PerformanceAverages, PerformanceOptimizer, PerformanceSample};
pub use settings::{Antialiasing, QualitySettings, Setting, SettingGroup, Tier};
pub use store::{
    FileStore, MemoryStore, PreferenceStore, UserPreferences, PREFERENCES_KEY, STATISTICS_KEY,
};
pub use transition::{Easing, Transition};
