//! Alert dispatch with per-kind debounce.
//!
//! Each [`AlertKind`] runs its own `Idle → Active → Cooldown → Idle` state
//! machine. A signal only produces an [`AlertEvent`] when its kind is idle,
//! so a sustained anomaly raises one alert per hold-plus-cooldown window
//! while different kinds surface independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Category of anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    Motion,
    Luminance,
    AudioPeak,
    UnknownEntity,
    DeviceMotion,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Motion,
        AlertKind::Luminance,
        AlertKind::AudioPeak,
        AlertKind::UnknownEntity,
        AlertKind::DeviceMotion,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            AlertKind::Motion => 0,
            AlertKind::Luminance => 1,
            AlertKind::AudioPeak => 2,
            AlertKind::UnknownEntity => 3,
            AlertKind::DeviceMotion => 4,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::Motion => "motion",
            AlertKind::Luminance => "luminance",
            AlertKind::AudioPeak => "audio_peak",
            AlertKind::UnknownEntity => "unknown_entity",
            AlertKind::DeviceMotion => "device_motion",
        };
        f.write_str(name)
    }
}

/// An alert surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub kind: AlertKind,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Confidence reported by the signalling source, when it has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Debounce state of one alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Active,
    Cooldown,
}

/// Central alert state machine. One per pipeline.
#[derive(Debug)]
pub struct AlertDispatcher {
    hold: Duration,
    cooldown: Duration,
    /// When each kind last went active
    activated_at: [Option<Instant>; 5],
    suppressed: u64,
}

impl AlertDispatcher {
    /// `hold` is how long a kind stays active, `cooldown` how long it stays
    /// suppressed after that.
    pub fn new(hold: Duration, cooldown: Duration) -> Self {
        Self {
            hold,
            cooldown,
            activated_at: [None; 5],
            suppressed: 0,
        }
    }

    /// Signal an anomaly. Returns the emitted event when `kind` was idle.
    pub fn dispatch(
        &mut self,
        kind: AlertKind,
        message: impl Into<String>,
        confidence: Option<f32>,
        now: Instant,
    ) -> Option<AlertEvent> {
        if self.state(kind, now) != AlertState::Idle {
            self.suppressed += 1;
            return None;
        }

        self.activated_at[kind.index()] = Some(now);
        Some(AlertEvent {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            message: message.into(),
            confidence,
        })
    }

    /// Current state of `kind` at `now`.
    pub fn state(&self, kind: AlertKind, now: Instant) -> AlertState {
        let Some(since) = self.activated_at[kind.index()] else {
            return AlertState::Idle;
        };
        let elapsed = now.saturating_duration_since(since);
        if elapsed < self.hold {
            AlertState::Active
        } else if elapsed < self.hold + self.cooldown {
            AlertState::Cooldown
        } else {
            AlertState::Idle
        }
    }

    /// Kinds currently active.
    pub fn active_kinds(&self, now: Instant) -> Vec<AlertKind> {
        AlertKind::ALL
            .into_iter()
            .filter(|&kind| self.state(kind, now) == AlertState::Active)
            .collect()
    }

    /// Signals dropped because their kind was active or cooling down.
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    /// Return every kind to idle.
    pub fn reset(&mut self) {
        self.activated_at = [None; 5];
    }
}
