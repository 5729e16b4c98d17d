//! Error types for the simulation core.
//!
//! Almost nothing in the per-tick path can fail: placement reports a `bool`,
//! degenerate geometry is a no-op and stale hits are skipped. These errors
//! cover construction and configuration, where a caller can decide to fall
//! back instead of crashing.

use std::fmt;

/// Top-level error enum for the simulation core.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A modular-ship blueprint does not have exactly one core module at the
    /// local origin, or lists the same cell twice.
    InvalidBlueprint {
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// Configuration text could not be parsed.
    ConfigParse {
        /// Message from the JSON parser.
        message: String,
    },

    /// Configuration file could not be read.
    ConfigIo {
        /// Path that was being read.
        path: String,
        /// Message from the OS.
        message: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidBlueprint { reason } => {
                write!(f, "invalid ship blueprint: {}", reason)
            }
            SimError::ConfigParse { message } => {
                write!(f, "failed to parse config: {}", message)
            }
            SimError::ConfigIo { path, message } => {
                write!(f, "failed to read config '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;
