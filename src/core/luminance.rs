//! Frame luminance tracking.

use crate::collector::types::Frame;

/// Rec. 709 luma weights.
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Mean Rec. 709 luminance over every pixel of a frame.
pub fn average_luminance(frame: &Frame) -> f64 {
    let sum: f64 = frame
        .pixels()
        .chunks_exact(4)
        .map(|px| LUMA_R * f64::from(px[0]) + LUMA_G * f64::from(px[1]) + LUMA_B * f64::from(px[2]))
        .sum();
    sum / frame.pixel_count() as f64
}

/// Relative change in percent; 0 when there is no usable previous value.
pub fn delta_percent(previous: Option<f64>, current: f64) -> f64 {
    match previous {
        Some(prev) if prev != 0.0 => ((current - prev) / prev).abs() * 100.0,
        _ => 0.0,
    }
}

/// Result of observing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceReading {
    pub average: f64,
    pub delta_percent: f64,
    pub spike: bool,
}

/// Flags large frame-to-frame luminance swings.
#[derive(Debug)]
pub struct LuminanceMonitor {
    threshold_percent: f64,
    previous: Option<f64>,
}

impl LuminanceMonitor {
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            threshold_percent,
            previous: None,
        }
    }

    /// Measure a frame and compare it against the previous one.
    pub fn observe(&mut self, frame: &Frame) -> LuminanceReading {
        self.observe_value(average_luminance(frame))
    }

    /// Compare an already-computed average against the previous one.
    pub fn observe_value(&mut self, average: f64) -> LuminanceReading {
        let delta_percent = delta_percent(self.previous, average);
        self.previous = Some(average);
        LuminanceReading {
            average,
            delta_percent,
            spike: delta_percent > self.threshold_percent,
        }
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// Forget the previous value, e.g. after the source changed resolution.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_luminance_white_and_black() {
        let white = Frame::solid(4, 4, [255, 255, 255, 255]).unwrap();
        let black = Frame::solid(4, 4, [0, 0, 0, 255]).unwrap();
        assert!((average_luminance(&white) - 255.0).abs() < 1e-9);
        assert_eq!(average_luminance(&black), 0.0);
    }

    #[test]
    fn test_weights_favor_green() {
        let green = Frame::solid(1, 1, [0, 100, 0, 255]).unwrap();
        let blue = Frame::solid(1, 1, [0, 0, 100, 255]).unwrap();
        assert!(average_luminance(&green) > average_luminance(&blue));
    }

    #[test]
    fn test_thirty_percent_swing_signals() {
        let mut monitor = LuminanceMonitor::new(20.0);
        let first = monitor.observe_value(100.0);
        assert!(!first.spike);
        assert_eq!(first.delta_percent, 0.0);

        let second = monitor.observe_value(130.0);
        assert!((second.delta_percent - 30.0).abs() < 1e-9);
        assert!(second.spike);
    }

    #[test]
    fn test_small_swing_is_quiet() {
        let mut monitor = LuminanceMonitor::new(20.0);
        monitor.observe_value(100.0);
        assert!(!monitor.observe_value(85.0).spike);
    }

    #[test]
    fn test_zero_previous_does_not_divide() {
        let mut monitor = LuminanceMonitor::new(20.0);
        monitor.observe_value(0.0);
        let reading = monitor.observe_value(50.0);
        assert_eq!(reading.delta_percent, 0.0);
        assert!(!reading.spike);
    }

    #[test]
    fn test_reset() {
        let mut monitor = LuminanceMonitor::new(20.0);
        monitor.observe_value(100.0);
        monitor.reset();
        assert!(monitor.previous().is_none());
        assert!(!monitor.observe_value(10.0).spike);
    }
}
