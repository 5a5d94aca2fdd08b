//! Error types for the Ghostwatch agent.
//!
//! Nothing in the detection core is fatal. These errors describe conditions
//! that the pipeline downgrades to a status change or a skipped tick.

use thiserror::Error;

/// Failures reported by a sensor source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The device (camera, microphone, motion sensor) is not available.
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The source started but its acquisition thread could not be spawned.
    #[error("{source_name} failed to spawn acquisition thread: {reason}")]
    SpawnFailed {
        source_name: &'static str,
        reason: String,
    },
}

/// Failures inside a detector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    /// Two frames being compared have different dimensions.
    #[error("frame dimensions differ: {current_width}x{current_height} vs {previous_width}x{previous_height}")]
    DimensionMismatch {
        current_width: u32,
        current_height: u32,
        previous_width: u32,
        previous_height: u32,
    },

    /// Pixel buffer length does not match `width * height * 4`.
    #[error("invalid frame: expected {expected} RGBA bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    /// A frame with zero width or height.
    #[error("invalid frame: zero-sized {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}

/// Failures reported by the external object classifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("classifier not ready: {0}")]
    NotReady(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier task aborted")]
    Aborted,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Lifecycle errors from the pipeline runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline is already running")]
    AlreadyRunning,

    #[error("pipeline is not running")]
    NotRunning,
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
