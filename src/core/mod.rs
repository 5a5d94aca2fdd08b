//! Core detectors for the Ghostwatch agent.
//!
//! This module contains:
//! - Frame history buffering and per-pixel motion diffing
//! - Ghost trail aggregation and motion-ratio scoring
//! - Luminance, audio-peak and device-motion detectors
//! - The unknown-entity classification gate
//! - Vision-mode color filters

pub mod audio;
pub mod classification;
pub mod diff;
pub mod history;
pub mod luminance;
pub mod motion;
pub mod trails;
pub mod vision_mode;

// Re-export commonly used types
pub use audio::AudioPeakDetector;
pub use classification::ClassificationGate;
pub use diff::{compute_diff, DiffPointSet, Point};
pub use history::{FrameHistory, FramePair};
pub use luminance::{average_luminance, LuminanceMonitor, LuminanceReading};
pub use motion::{DeviceMotionDetector, MotionAnomaly};
pub use trails::{GhostTrails, TrailSnapshot};
pub use vision_mode::VisionMode;
