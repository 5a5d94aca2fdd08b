//! Pipeline activity log.
//!
//! Tracks counters for everything the pipeline does (frames processed,
//! alerts raised, stream restarts, classifier failures) and keeps a short
//! ring of recent human-readable entries for display.

use crate::alert::{AlertEvent, AlertKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Number of recent entries kept in memory.
pub const RECENT_ENTRY_LIMIT: usize = 200;

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub time: DateTime<Utc>,
    pub message: String,
}

/// Activity counters for the current session.
#[derive(Debug)]
pub struct ActivityLog {
    frames_processed: AtomicU64,
    /// Alerts raised, indexed like [`AlertKind::ALL`]
    alerts: [AtomicU64; 5],
    alerts_suppressed: AtomicU64,
    restarts: AtomicU64,
    restart_failures: AtomicU64,
    classifier_failures: AtomicU64,
    dimension_resets: AtomicU64,
    recent: Mutex<VecDeque<ActivityEntry>>,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            alerts: Default::default(),
            alerts_suppressed: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            restart_failures: AtomicU64::new(0),
            classifier_failures: AtomicU64::new(0),
            dimension_resets: AtomicU64::new(0),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_ENTRY_LIMIT)),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that loads and saves cumulative counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!("Could not load previous activity stats: {e}");
        }

        log
    }

    pub fn record_frame(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self, event: &AlertEvent) {
        self.alerts[event.kind.index()].fetch_add(1, Ordering::Relaxed);
        self.note(format!("[{}] {}", event.kind, event.message));
    }

    pub fn record_suppressed(&self, count: u64) {
        self.alerts_suppressed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a stream restart and whether it recovered every source.
    pub fn record_restart(&self, recovered: bool) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
        if recovered {
            self.note("Sensor streams restarted");
        } else {
            self.restart_failures.fetch_add(1, Ordering::Relaxed);
            self.note("Sensor restart incomplete; pipeline degraded");
        }
    }

    pub fn record_classifier_failure(&self, reason: &str) {
        self.classifier_failures.fetch_add(1, Ordering::Relaxed);
        self.note(format!("Classifier failed: {reason}"));
    }

    pub fn record_dimension_reset(&self) {
        self.dimension_resets.fetch_add(1, Ordering::Relaxed);
        self.note("Frame size changed; history cleared");
    }

    /// Append a free-form entry, dropping the oldest past the limit.
    pub fn note(&self, message: impl Into<String>) {
        let mut recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
        recent.push_back(ActivityEntry {
            time: Utc::now(),
            message: message.into(),
        });
        while recent.len() > RECENT_ENTRY_LIMIT {
            recent.pop_front();
        }
    }

    /// Recent entries, oldest first.
    pub fn recent(&self) -> Vec<ActivityEntry> {
        self.recent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> ActivityStats {
        let alert = |kind: AlertKind| self.alerts[kind.index()].load(Ordering::Relaxed);
        ActivityStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            alerts: AlertCounts {
                motion: alert(AlertKind::Motion),
                luminance: alert(AlertKind::Luminance),
                audio_peak: alert(AlertKind::AudioPeak),
                unknown_entity: alert(AlertKind::UnknownEntity),
                device_motion: alert(AlertKind::DeviceMotion),
            },
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            restart_failures: self.restart_failures.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            dimension_resets: self.dimension_resets.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames processed: {}\n\
             - Alerts raised: {} (motion {}, luminance {}, audio {}, unknown entity {}, device motion {})\n\
             - Alerts suppressed by cooldown: {}\n\
             - Stream restarts: {} ({} degraded)\n\
             - Classifier failures: {}\n\
             - Frame size resets: {}\n\
             - Session duration: {} seconds",
            stats.frames_processed,
            stats.alerts.total(),
            stats.alerts.motion,
            stats.alerts.luminance,
            stats.alerts.audio_peak,
            stats.alerts.unknown_entity,
            stats.alerts.device_motion,
            stats.alerts_suppressed,
            stats.restarts,
            stats.restart_failures,
            stats.classifier_failures,
            stats.dimension_resets,
            stats.session_duration_secs
        )
    }

    /// Save counters and recent entries to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedActivity {
                frames_processed: stats.frames_processed,
                alerts: stats.alerts,
                alerts_suppressed: stats.alerts_suppressed,
                restarts: stats.restarts,
                restart_failures: stats.restart_failures,
                classifier_failures: stats.classifier_failures,
                dimension_resets: stats.dimension_resets,
                recent: self.recent(),
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = read_persisted(path)?;

                self.frames_processed
                    .store(persisted.frames_processed, Ordering::Relaxed);
                for kind in AlertKind::ALL {
                    self.alerts[kind.index()]
                        .store(persisted.alerts.get(kind), Ordering::Relaxed);
                }
                self.alerts_suppressed
                    .store(persisted.alerts_suppressed, Ordering::Relaxed);
                self.restarts.store(persisted.restarts, Ordering::Relaxed);
                self.restart_failures
                    .store(persisted.restart_failures, Ordering::Relaxed);
                self.classifier_failures
                    .store(persisted.classifier_failures, Ordering::Relaxed);
                self.dimension_resets
                    .store(persisted.dimension_resets, Ordering::Relaxed);

                let mut recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
                recent.extend(persisted.recent);
                while recent.len() > RECENT_ENTRY_LIMIT {
                    recent.pop_front();
                }
            }
        }
        Ok(())
    }

    /// Reset all counters and clear recent entries.
    pub fn reset(&self) {
        self.frames_processed.store(0, Ordering::Relaxed);
        for counter in &self.alerts {
            counter.store(0, Ordering::Relaxed);
        }
        self.alerts_suppressed.store(0, Ordering::Relaxed);
        self.restarts.store(0, Ordering::Relaxed);
        self.restart_failures.store(0, Ordering::Relaxed);
        self.classifier_failures.store(0, Ordering::Relaxed);
        self.dimension_resets.store(0, Ordering::Relaxed);
        self.recent.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Alerts raised per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub motion: u64,
    pub luminance: u64,
    pub audio_peak: u64,
    pub unknown_entity: u64,
    pub device_motion: u64,
}

impl AlertCounts {
    pub fn get(&self, kind: AlertKind) -> u64 {
        match kind {
            AlertKind::Motion => self.motion,
            AlertKind::Luminance => self.luminance,
            AlertKind::AudioPeak => self.audio_peak,
            AlertKind::UnknownEntity => self.unknown_entity,
            AlertKind::DeviceMotion => self.device_motion,
        }
    }

    pub fn total(&self) -> u64 {
        AlertKind::ALL.iter().map(|&k| self.get(k)).sum()
    }
}

/// Snapshot of activity statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub frames_processed: u64,
    pub alerts: AlertCounts,
    pub alerts_suppressed: u64,
    pub restarts: u64,
    pub restart_failures: u64,
    pub classifier_failures: u64,
    pub dimension_resets: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// On-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedActivity {
    pub frames_processed: u64,
    pub alerts: AlertCounts,
    pub alerts_suppressed: u64,
    pub restarts: u64,
    pub restart_failures: u64,
    pub classifier_failures: u64,
    pub dimension_resets: u64,
    #[serde(default)]
    pub recent: Vec<ActivityEntry>,
    pub last_updated: DateTime<Utc>,
}

/// Read a persisted activity file without attaching it to a live log.
pub fn read_persisted(path: &std::path::Path) -> Result<PersistedActivity, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
