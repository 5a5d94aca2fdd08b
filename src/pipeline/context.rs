//! Per-tick processing state.
//!
//! [`PipelineContext`] owns every detector and the alert dispatcher. It is
//! driven synchronously, one tick at a time, by whichever task owns it.

use crate::activity::SharedActivityLog;
use crate::alert::{AlertDispatcher, AlertEvent, AlertKind};
use crate::collector::types::{AudioSpectrum, Classification, Frame, MotionSample};
use crate::config::Config;
use crate::core::{
    compute_diff, AudioPeakDetector, ClassificationGate, DeviceMotionDetector, FrameHistory,
    FramePair, GhostTrails, LuminanceMonitor, TrailSnapshot, VisionMode,
};
use crate::error::{ClassifierError, DetectError};
use crate::supervisor::SensorSamples;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickReport {
    /// The frame processed this tick, if the camera delivered one
    pub frame: Option<Arc<Frame>>,
    pub alerts: Vec<AlertEvent>,
}

impl TickReport {
    /// A tick counts toward the heartbeat only when it processed a fresh frame.
    pub fn processed_frame(&self) -> bool {
        self.frame.is_some()
    }
}

pub struct PipelineContext {
    motion_sensitivity: u32,
    motion_ratio_threshold: f64,
    vision_mode: VisionMode,
    audio_enabled: bool,
    motion_enabled: bool,
    history: FrameHistory,
    trails: GhostTrails,
    luminance: LuminanceMonitor,
    audio: AudioPeakDetector,
    motion: DeviceMotionDetector,
    gate: ClassificationGate,
    dispatcher: AlertDispatcher,
    activity: SharedActivityLog,
}

impl PipelineContext {
    pub fn new(config: &Config, activity: SharedActivityLog) -> Self {
        Self {
            motion_sensitivity: config.motion_sensitivity,
            motion_ratio_threshold: config.motion_ratio_threshold,
            vision_mode: config.vision_mode,
            audio_enabled: config.audio_enabled,
            motion_enabled: config.motion_enabled,
            history: FrameHistory::new(config.max_history),
            trails: GhostTrails::new(config.max_trails),
            luminance: LuminanceMonitor::new(config.luminance_delta_percent_threshold),
            audio: AudioPeakDetector::new(config.audio_peak_threshold),
            motion: DeviceMotionDetector::new(
                config.acceleration_threshold,
                config.rotation_rate_threshold,
            ),
            gate: ClassificationGate::new(
                &config.classification_allow_list,
                config.classification_min_confidence,
            ),
            dispatcher: AlertDispatcher::new(config.alert_hold, config.alert_cooldown),
            activity,
        }
    }

    /// Run every detector over the newest samples.
    pub fn tick(&mut self, samples: SensorSamples, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if let Some(frame) = samples.frame {
            let (frame, alerts) = self.process_frame(frame, now);
            report.frame = Some(frame);
            report.alerts.extend(alerts);
        }
        if let Some(spectrum) = samples.spectrum {
            report.alerts.extend(self.process_audio(&spectrum, now));
        }
        if let Some(sample) = samples.motion {
            report.alerts.extend(self.process_motion(&sample, now));
        }

        report
    }

    /// Buffer a frame, then run the luminance and motion-diff detectors on it.
    ///
    /// Returns the filtered frame as stored in the history.
    pub fn process_frame(&mut self, frame: Frame, now: Instant) -> (Arc<Frame>, Vec<AlertEvent>) {
        let frame = Arc::new(self.vision_mode.apply(&frame));
        let mut alerts = Vec::new();
        self.activity.record_frame();

        self.history.push(frame.clone());
        let diff = match self.history.latest_pair() {
            FramePair::Pair { current, previous } => {
                Some(compute_diff(current, previous, self.motion_sensitivity))
            }
            FramePair::Single(_) | FramePair::Empty => None,
        };

        match diff {
            Some(Ok(diff)) => {
                if self.trails.record(diff)
                    && self.trails.motion_ratio_signal(self.motion_ratio_threshold)
                {
                    self.emit(AlertKind::Motion, "GHOST-LIKE MOTION DETECTED", None, now, &mut alerts);
                }
            }
            Some(Err(DetectError::DimensionMismatch {
                current_width,
                current_height,
                previous_width,
                previous_height,
            })) => {
                debug!(
                    "Frame size changed from {previous_width}x{previous_height} \
                     to {current_width}x{current_height}; resetting history"
                );
                self.reset_streams();
                self.history.push(frame.clone());
                self.activity.record_dimension_reset();
            }
            Some(Err(e)) => warn!("Motion diff skipped: {e}"),
            None => {}
        }

        let reading = self.luminance.observe(&frame);
        if reading.spike {
            self.emit(AlertKind::Luminance, "LUMINANCE SPIKE DETECTED", None, now, &mut alerts);
        }

        (frame, alerts)
    }

    pub fn process_audio(&mut self, spectrum: &AudioSpectrum, now: Instant) -> Option<AlertEvent> {
        if !self.audio_enabled || !self.audio.evaluate(&spectrum.magnitudes) {
            return None;
        }
        let mut alerts = Vec::with_capacity(1);
        self.emit(AlertKind::AudioPeak, "AUDIO PEAK / DISTRESS", None, now, &mut alerts);
        alerts.pop()
    }

    pub fn process_motion(&mut self, sample: &MotionSample, now: Instant) -> Option<AlertEvent> {
        if !self.motion_enabled {
            return None;
        }
        let anomaly = self.motion.evaluate(sample)?;
        let mut alerts = Vec::with_capacity(1);
        self.emit(AlertKind::DeviceMotion, anomaly.message(), None, now, &mut alerts);
        alerts.pop()
    }

    /// Interpret one classifier response. Failures count as "no detections".
    pub fn process_classifications(
        &mut self,
        result: Result<Vec<Classification>, ClassifierError>,
        now: Instant,
    ) -> Option<AlertEvent> {
        let results = match result {
            Ok(results) => results,
            Err(e) => {
                warn!("Classifier failed, ignoring this frame: {e}");
                self.activity.record_classifier_failure(&e.to_string());
                return None;
            }
        };

        let unknown = self.gate.evaluate(&results)?;
        let message = format!(
            "UNKNOWN ENTITY DETECTED: {} ({}%)",
            unknown.label,
            (unknown.confidence * 100.0) as u32
        );
        let confidence = Some(unknown.confidence);
        let mut alerts = Vec::with_capacity(1);
        self.emit(AlertKind::UnknownEntity, message, confidence, now, &mut alerts);
        alerts.pop()
    }

    /// Drop frame-derived state after the streams were re-acquired or resized.
    pub fn reset_streams(&mut self) {
        self.history.clear();
        self.trails.clear();
        self.luminance.reset();
    }

    /// Return every alert kind to idle for a new session.
    pub fn reset_alerts(&mut self) {
        self.dispatcher.reset();
    }

    pub fn trails(&self) -> TrailSnapshot {
        self.trails.snapshot()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    fn emit(
        &mut self,
        kind: AlertKind,
        message: impl Into<String>,
        confidence: Option<f32>,
        now: Instant,
        alerts: &mut Vec<AlertEvent>,
    ) {
        match self.dispatcher.dispatch(kind, message, confidence, now) {
            Some(event) => {
                debug!(kind = %event.kind, "{}", event.message);
                self.activity.record_alert(&event);
                alerts.push(event);
            }
            None => self.activity.record_suppressed(1),
        }
    }
}
