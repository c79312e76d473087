//! Graceful-default helpers
//!
//! Frame-loop code must never abort on a bad input. Fallible work is written
//! as a `Result`-returning closure and wrapped here, which logs the failure
//! once and hands back the caller's safe default.

use crate::error::{BubbleError, Result};

/// Run `f`, returning `default` (and logging a warning) if it fails.
pub fn with_fallback<T>(context: &str, default: T, f: impl FnOnce() -> Result<T>) -> T {
    match f() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(context, error = %err, "falling back to default");
            default
        }
    }
}

/// Like [`with_fallback`], computing the default lazily.
pub fn with_fallback_else<T>(
    context: &str,
    f: impl FnOnce() -> Result<T>,
    default: impl FnOnce() -> T,
) -> T {
    match f() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(context, error = %err, "falling back to default");
            default()
        }
    }
}

/// Reject non-finite coordinate pairs.
pub fn ensure_finite(operation: &'static str, x: f32, y: f32) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(BubbleError::InvalidCoordinate { operation, x, y })
    }
}
