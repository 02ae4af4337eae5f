// src/error.rs
//! Error taxonomy for the display backend.

use thiserror::Error;

/// Failure surfaced by a backend operation.
///
/// Native failures are carried unchanged to the caller; the backend never
/// retries and never reinterprets them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// A native call reported an error.
    #[error("{op} failed: {message}")]
    Platform { op: &'static str, message: String },
    /// The operation is deliberately absent on this platform.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("Failed to load OpenGL library: {0}")]
    LibraryLoad(String),
    #[error("Failed to open X display: {0}")]
    DisplayUnavailable(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DisplayError {
    /// Shorthand for a native failure of `op`.
    pub fn platform(op: &'static str, message: impl Into<String>) -> Self {
        DisplayError::Platform {
            op,
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, DisplayError::Unsupported(_))
    }
}

pub type Result<T> = std::result::Result<T, DisplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_names_the_failing_operation() {
        let err = DisplayError::platform("XF86VidModeSwitchToMode", "no matching mode line");
        assert_eq!(
            err.to_string(),
            "XF86VidModeSwitchToMode failed: no matching mode line"
        );
    }

    #[test]
    fn unsupported_is_distinguishable_from_native_failures() {
        assert!(DisplayError::Unsupported("set_pbuffer_attrib").is_unsupported());
        assert!(!DisplayError::platform("glXCreatePbuffer", "BadAlloc").is_unsupported());
    }
}
