//! Sensor stream supervision.
//!
//! The supervisor owns every sensor source. A restart always finishes
//! tearing down all sources before it starts any of them, and each source
//! ends up either fully started or fully stopped.

use crate::collector::types::{AudioSpectrum, Frame, MotionSample};
use crate::collector::{SensorSource, SensorSources};
use crate::error::SourceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle of the supervised streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Running,
    Restarting,
}

/// Result of a restart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Every source was re-acquired.
    Recovered,
    /// Teardown completed but some sources could not be re-acquired.
    Degraded { failures: Vec<SourceError> },
    /// Another restart was already running; this request was dropped.
    AlreadyInProgress,
}

/// Newest samples taken from the running sources.
#[derive(Debug, Default)]
pub struct SensorSamples {
    pub frame: Option<Frame>,
    pub spectrum: Option<AudioSpectrum>,
    pub motion: Option<MotionSample>,
}

/// Owns and restarts the video, audio and motion sources.
pub struct StreamSupervisor {
    sources: SensorSources,
    state: SupervisorState,
    failures: Vec<SourceError>,
    restarts: u64,
}

impl StreamSupervisor {
    pub fn new(sources: SensorSources) -> Self {
        Self {
            sources,
            state: SupervisorState::Stopped,
            failures: Vec::new(),
            restarts: 0,
        }
    }

    /// Start every source. Sources that fail stay stopped.
    pub fn acquire(&mut self) -> Result<(), Vec<SourceError>> {
        let mut failures = Vec::new();
        start_source(self.sources.video.as_mut(), &mut failures);
        start_source(self.sources.audio.as_mut(), &mut failures);
        start_source(self.sources.motion.as_mut(), &mut failures);

        self.state = SupervisorState::Running;
        self.failures = failures.clone();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Stop every source and release its resources.
    pub fn teardown(&mut self) {
        self.sources.video.stop();
        self.sources.audio.stop();
        self.sources.motion.stop();
        self.state = SupervisorState::Stopped;
    }

    /// Tear down all sources, then re-acquire them.
    pub fn restart(&mut self) -> RestartOutcome {
        self.state = SupervisorState::Restarting;
        self.restarts += 1;
        info!(restart = self.restarts, "Restarting sensor streams");

        self.teardown();
        self.state = SupervisorState::Restarting;

        match self.acquire() {
            Ok(()) => {
                info!(restart = self.restarts, "Sensor streams re-acquired");
                RestartOutcome::Recovered
            }
            Err(failures) => {
                for failure in &failures {
                    warn!(restart = self.restarts, error = %failure, "Sensor re-acquisition failed");
                }
                RestartOutcome::Degraded { failures }
            }
        }
    }

    /// Take the newest sample from each running source.
    pub fn poll(&mut self) -> SensorSamples {
        if self.state != SupervisorState::Running {
            return SensorSamples::default();
        }
        SensorSamples {
            frame: poll_source(self.sources.video.as_mut()),
            spectrum: poll_source(self.sources.audio.as_mut()),
            motion: poll_source(self.sources.motion.as_mut()),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Whether the last acquisition left any source stopped.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures from the last acquisition.
    pub fn failures(&self) -> &[SourceError] {
        &self.failures
    }

    pub fn restart_count(&self) -> u64 {
        self.restarts
    }
}

fn start_source<T>(source: &mut dyn SensorSource<Sample = T>, failures: &mut Vec<SourceError>) {
    match source.start() {
        Ok(()) => info!(source = source.name(), "Sensor source started"),
        Err(e) => {
            // Leave nothing half-initialized
            source.stop();
            failures.push(e);
        }
    }
}

fn poll_source<T>(source: &mut dyn SensorSource<Sample = T>) -> Option<T> {
    if source.is_running() {
        source.latest()
    } else {
        None
    }
}

/// Ensures at most one restart is in flight.
#[derive(Debug, Default)]
pub struct RestartGuard {
    in_flight: Arc<AtomicBool>,
}

/// Held for the duration of a restart; releases the guard on drop.
#[derive(Debug)]
pub struct RestartTicket {
    in_flight: Arc<AtomicBool>,
}

impl RestartGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the restart slot, or `None` if a restart is already running.
    pub fn try_begin(&self) -> Option<RestartTicket> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RestartTicket {
                in_flight: self.in_flight.clone(),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for RestartTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}
