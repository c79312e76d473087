//! Error types shared by every bubble crate

use thiserror::Error;

/// Errors raised by the render pipeline.
///
/// None of these are fatal: public entry points that promise not to fail
/// route them through [`crate::fallback::with_fallback`] and substitute a
/// safe default.
#[derive(Error, Debug)]
pub enum BubbleError {
    /// Host metrics or a host capability are missing
    #[error("Environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    /// A coordinate or size was NaN or infinite
    #[error("Invalid coordinate for {operation}: ({x}, {y})")]
    InvalidCoordinate {
        operation: &'static str,
        x: f32,
        y: f32,
    },

    /// Unknown quality level name
    #[error("Invalid quality level: {0}")]
    InvalidQualityLevel(String),

    /// Unknown UI element descriptor
    #[error("Unknown UI element: {0}")]
    UnknownElement(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Preference storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A render callback failed
    #[error("Render failed for {id}: {message}")]
    Render { id: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl BubbleError {
    pub fn render(id: impl Into<String>, message: impl Into<String>) -> Self {
        BubbleError::Render {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Result type for bubble operations
pub type Result<T> = std::result::Result<T, BubbleError>;
