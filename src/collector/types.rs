//! Sample types delivered by sensor sources and the classifier.

use crate::error::DetectError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A captured video frame with RGBA pixel data.
///
/// Frames are immutable once built. Pixel data sits behind an `Arc` so the
/// history buffer and an in-flight classification can share one capture.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Build a frame, checking that `pixels` holds exactly `width * height` RGBA values.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DetectError> {
        Self::with_timestamp(Utc::now(), width, height, pixels)
    }

    /// Build a frame with an explicit capture time.
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, DetectError> {
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyFrame { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DetectError::InvalidFrame {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            timestamp,
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A frame filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, DetectError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether two frames can be compared pixel by pixel.
    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// One magnitude-spectrum snapshot from the audio analyzer.
///
/// Magnitudes follow the 0-255 byte scale of a typical FFT analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSpectrum {
    pub timestamp: DateTime<Utc>,
    pub magnitudes: Vec<f32>,
}

impl AudioSpectrum {
    pub fn new(magnitudes: Vec<f32>) -> Self {
        Self {
            timestamp: Utc::now(),
            magnitudes,
        }
    }
}

/// Linear acceleration in m/s².
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Rotation rate in degrees per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationRate {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// A device-motion reading.
///
/// Platforms report either or both of acceleration and rotation rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub timestamp: DateTime<Utc>,
    pub acceleration: Option<Acceleration>,
    pub rotation_rate: Option<RotationRate>,
}

impl MotionSample {
    /// An accelerometer-only reading.
    pub fn acceleration(x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            acceleration: Some(Acceleration { x, y, z }),
            rotation_rate: None,
        }
    }

    /// A gyroscope-only reading.
    pub fn rotation(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            acceleration: None,
            rotation_rate: Some(RotationRate { alpha, beta, gamma }),
        }
    }
}

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One labelled detection produced by the external classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}
