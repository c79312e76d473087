//! Initial level detection from device capabilities

use serde::{Deserialize, Serialize};

use crate::level::QualityLevel;

/// What the host can tell us about the device
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Whether a hardware-accelerated context is available
    pub accelerated: bool,
    /// Installed memory; `None` when the host cannot report it
    pub memory_gb: Option<f32>,
    /// Logical cores; `None` when unknown
    pub cores: Option<usize>,
}

impl DeviceCapabilities {
    /// Capabilities of the current process's machine.
    ///
    /// Memory is not observable from the standard library and is left unknown.
    pub fn probe() -> Self {
        Self {
            accelerated: true,
            memory_gb: None,
            cores: std::thread::available_parallelism().ok().map(|n| n.get()),
        }
    }
}

/// Pick a starting level. Unknown memory counts as 1 GB and unknown cores
/// as 2.
pub fn detect_optimal_level(caps: &DeviceCapabilities) -> QualityLevel {
    if !caps.accelerated {
        return QualityLevel::Low;
    }
    let memory = caps.memory_gb.unwrap_or(1.0);
    let cores = caps.cores.unwrap_or(2);
    let level = if memory >= 4.0 && cores >= 8 {
        QualityLevel::High
    } else if memory >= 2.0 && cores >= 4 {
        QualityLevel::Medium
    } else {
        QualityLevel::Low
    };
    tracing::debug!(?caps, %level, "detected starting quality level");
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(accelerated: bool, memory_gb: Option<f32>, cores: Option<usize>) -> DeviceCapabilities {
        DeviceCapabilities {
            accelerated,
            memory_gb,
            cores,
        }
    }

    #[test]
    fn test_detection_thresholds() {
        assert_eq!(detect_optimal_level(&caps(false, Some(16.0), Some(16))), QualityLevel::Low);
        assert_eq!(detect_optimal_level(&caps(true, Some(8.0), Some(8))), QualityLevel::High);
        assert_eq!(detect_optimal_level(&caps(true, Some(4.0), Some(4))), QualityLevel::Medium);
        assert_eq!(detect_optimal_level(&caps(true, Some(2.0), Some(8))), QualityLevel::Medium);
        assert_eq!(detect_optimal_level(&caps(true, Some(1.0), Some(8))), QualityLevel::Low);
    }

    #[test]
    fn test_unknown_memory_is_conservative() {
        assert_eq!(detect_optimal_level(&caps(true, None, Some(32))), QualityLevel::Low);
    }
}
