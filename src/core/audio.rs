//! Audio peak detection over a magnitude spectrum.

/// Signals when any spectrum bin exceeds a fixed magnitude.
#[derive(Debug, Clone, Copy)]
pub struct AudioPeakDetector {
    threshold: f32,
}

impl AudioPeakDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Whether the loudest bin exceeds the threshold. Empty spectra never signal.
    pub fn evaluate(&self, spectrum: &[f32]) -> bool {
        peak(spectrum).is_some_and(|p| p > self.threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Loudest bin, ignoring NaN values.
pub fn peak(spectrum: &[f32]) -> Option<f32> {
    spectrum
        .iter()
        .copied()
        .filter(|m| !m.is_nan())
        .reduce(f32::max)
}
