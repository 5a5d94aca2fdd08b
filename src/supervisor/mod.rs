//! Liveness monitoring and stream recovery.

pub mod stream;
pub mod watchdog;

pub use stream::{
    RestartGuard, RestartOutcome, RestartTicket, SensorSamples, StreamSupervisor, SupervisorState,
};
pub use watchdog::{HeartbeatCheck, HeartbeatWatchdog, WatchdogState};
