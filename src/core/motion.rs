//! Device-motion anomaly detection.

use crate::collector::types::MotionSample;

/// Which motion channel crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAnomaly {
    Acceleration,
    Rotation,
}

impl MotionAnomaly {
    pub fn message(self) -> &'static str {
        match self {
            MotionAnomaly::Acceleration => "DEVICE MOTION ANOMALY DETECTED",
            MotionAnomaly::Rotation => "DEVICE ROTATION ANOMALY DETECTED",
        }
    }
}

/// Flags any accelerometer or gyroscope axis beyond its threshold.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMotionDetector {
    acceleration_threshold: f64,
    rotation_rate_threshold: f64,
}

impl DeviceMotionDetector {
    pub fn new(acceleration_threshold: f64, rotation_rate_threshold: f64) -> Self {
        Self {
            acceleration_threshold,
            rotation_rate_threshold,
        }
    }

    /// Acceleration is checked before rotation.
    pub fn evaluate(&self, sample: &MotionSample) -> Option<MotionAnomaly> {
        if let Some(a) = sample.acceleration {
            if exceeds([a.x, a.y, a.z], self.acceleration_threshold) {
                return Some(MotionAnomaly::Acceleration);
            }
        }
        if let Some(r) = sample.rotation_rate {
            if exceeds([r.alpha, r.beta, r.gamma], self.rotation_rate_threshold) {
                return Some(MotionAnomaly::Rotation);
            }
        }
        None
    }
}

fn exceeds(axes: [f64; 3], threshold: f64) -> bool {
    axes.iter().any(|v| v.abs() > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resting_device_is_quiet() {
        let detector = DeviceMotionDetector::new(15.0, 200.0);
        assert_eq!(detector.evaluate(&MotionSample::acceleration(0.1, 0.0, 9.81)), None);
        assert_eq!(detector.evaluate(&MotionSample::rotation(10.0, -5.0, 0.0)), None);
    }

    #[test]
    fn test_any_axis_triggers() {
        let detector = DeviceMotionDetector::new(15.0, 200.0);
        assert_eq!(
            detector.evaluate(&MotionSample::acceleration(-15.5, 0.0, 9.81)),
            Some(MotionAnomaly::Acceleration)
        );
        assert_eq!(
            detector.evaluate(&MotionSample::rotation(0.0, 0.0, -201.0)),
            Some(MotionAnomaly::Rotation)
        );
    }
}
