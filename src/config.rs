//! Configuration for the Ghostwatch agent.
//!
//! A [`Config`] is supplied once when a pipeline is constructed and is never
//! mutated afterwards. Every threshold a detector uses lives here so behavior
//! can be tuned without recompiling.

use crate::core::vision_mode::VisionMode;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-pixel RGB delta sum a pixel must exceed to count as changed
    pub motion_sensitivity: u32,

    /// Fraction of changed pixels that raises a motion alert
    pub motion_ratio_threshold: f64,

    /// Relative frame-to-frame luminance swing (percent) that raises an alert
    pub luminance_delta_percent_threshold: f64,

    /// Spectrum magnitude that raises an audio-peak alert
    pub audio_peak_threshold: f32,

    /// Per-axis acceleration (m/s²) that raises a device-motion alert
    pub acceleration_threshold: f64,

    /// Per-axis rotation rate (deg/s) that raises a device-motion alert
    pub rotation_rate_threshold: f64,

    /// Classifier confidence a detection must exceed to be considered
    pub classification_min_confidence: f32,

    /// Labels that never raise an unknown-entity alert
    pub classification_allow_list: Vec<String>,

    /// Number of recent frames kept for diffing
    pub max_history: usize,

    /// Number of recent diff sets kept for trails
    pub max_trails: usize,

    /// Interval between heartbeat checks
    #[serde(with = "duration_ms")]
    pub heartbeat_interval: Duration,

    /// Interval between processing ticks
    #[serde(with = "duration_ms")]
    pub tick_interval: Duration,

    /// How long an alert stays active before cooling down
    #[serde(with = "duration_ms")]
    pub alert_hold: Duration,

    /// How long a kind stays suppressed after its active window
    #[serde(with = "duration_ms")]
    pub alert_cooldown: Duration,

    /// Color filter applied to every captured frame
    pub vision_mode: VisionMode,

    /// Whether the audio channel is evaluated
    pub audio_enabled: bool,

    /// Whether the device-motion channel is evaluated
    pub motion_enabled: bool,

    /// Path for storing the activity log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ghostwatch");

        Self {
            motion_sensitivity: 60,
            motion_ratio_threshold: 0.02,
            luminance_delta_percent_threshold: 20.0,
            audio_peak_threshold: 250.0,
            acceleration_threshold: 15.0,
            rotation_rate_threshold: 200.0,
            classification_min_confidence: 0.45,
            classification_allow_list: vec![
                "person".to_string(),
                "chair".to_string(),
                "table".to_string(),
            ],
            max_history: 6,
            max_trails: 12,
            heartbeat_interval: Duration::from_millis(2000),
            tick_interval: Duration::from_millis(33),
            alert_hold: Duration::from_millis(2000),
            alert_cooldown: Duration::from_millis(1000),
            vision_mode: VisionMode::Normal,
            audio_enabled: true,
            motion_enabled: true,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ghostwatch")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Path of the persisted activity log.
    pub fn activity_log_path(&self) -> PathBuf {
        self.data_path.join("activity.json")
    }

    /// Check that every value is usable by the detectors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history < 2 {
            return Err(ConfigError::invalid(
                "max_history",
                "must be at least 2 to compare consecutive frames",
            ));
        }
        if self.max_trails == 0 {
            return Err(ConfigError::invalid("max_trails", "must be at least 1"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::invalid("heartbeat_interval", "must be non-zero"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::invalid("tick_interval", "must be non-zero"));
        }
        if !(self.motion_ratio_threshold > 0.0 && self.motion_ratio_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "motion_ratio_threshold",
                format!("must be in (0, 1], got {}", self.motion_ratio_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.classification_min_confidence) {
            return Err(ConfigError::invalid(
                "classification_min_confidence",
                format!("must be in [0, 1], got {}", self.classification_min_confidence),
            ));
        }

        let thresholds = [
            ("luminance_delta_percent_threshold", self.luminance_delta_percent_threshold),
            ("audio_peak_threshold", f64::from(self.audio_peak_threshold)),
            ("acceleration_threshold", self.acceleration_threshold),
            ("rotation_rate_threshold", self.rotation_rate_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
