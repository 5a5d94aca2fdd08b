//! Ghostwatch Agent - real-time anomaly detection over camera, audio and motion streams.
//!
//! This library turns continuous sensor streams into debounced alerts and
//! keeps those streams alive: a heartbeat watchdog restarts acquisition when
//! the processing loop stops receiving frames.
//!
//! # Detectors
//!
//! - **Motion**: per-pixel frame differencing, trails of recent changes
//! - **Luminance**: frame-to-frame brightness swings
//! - **Audio peak**: loud events in a frequency spectrum
//! - **Device motion**: acceleration and rotation spikes
//! - **Unknown entity**: classifier labels outside an allow-list
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Ghostwatch Agent                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │  Collector  │──▶│   Pipeline  │──▶│    Alert    │──▶ alerts() │
//! │  │  (sources)  │   │ (detectors) │   │ Dispatcher  │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! │         ▲                 │                  │                    │
//! │         │                 ▼                  ▼                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │   Stream    │◀──│  Heartbeat  │   │  Activity   │             │
//! │  │ Supervisor  │   │  Watchdog   │   │     Log     │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ghostwatch_agent::collector::{ChannelSource, SensorSources};
//! use ghostwatch_agent::{Config, Pipeline};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (camera, camera_feed) = ChannelSource::new("camera");
//! let (microphone, _) = ChannelSource::new("microphone");
//! let (motion, _) = ChannelSource::new("motion");
//! let sources = SensorSources::new(Box::new(camera), Box::new(microphone), Box::new(motion));
//!
//! let pipeline = Pipeline::new(Config::default(), sources, None)?;
//! pipeline.start().await?;
//!
//! // Platform code pushes frames through `camera_feed`
//! for alert in pipeline.alerts().try_iter() {
//!     println!("{}", alert.message);
//! }
//! # drop(camera_feed);
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod alert;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod supervisor;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use alert::{AlertDispatcher, AlertEvent, AlertKind};
pub use collector::{Classifier, Frame, SensorSource, SensorSources};
pub use config::Config;
pub use core::VisionMode;
pub use error::{ClassifierError, ConfigError, DetectError, PipelineError, SourceError};
pub use pipeline::{Pipeline, PipelineContext, PipelineStatus};
pub use supervisor::{HeartbeatWatchdog, RestartOutcome, StreamSupervisor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
