//! Heartbeat watchdog for the processing loop.
//!
//! The tick task calls [`HeartbeatWatchdog::mark_alive`] after every tick
//! that processed a fresh frame. A fixed-interval timer calls
//! [`HeartbeatWatchdog::check`], which clears the flag; a check that finds it
//! already clear is a missed heartbeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// Point-in-time view of the watchdog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogState {
    pub alive: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub consecutive_misses: u32,
    pub total_misses: u64,
}

/// Outcome of one heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCheck {
    Alive,
    Missed { consecutive_misses: u32 },
}

/// Liveness flag shared between the tick task and the heartbeat timer.
#[derive(Debug, Default)]
pub struct HeartbeatWatchdog {
    alive: AtomicBool,
    consecutive_misses: AtomicU32,
    total_misses: AtomicU64,
    last_checked_at: Mutex<Option<DateTime<Utc>>>,
}

impl HeartbeatWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tick.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::SeqCst);
        self.consecutive_misses.store(0, Ordering::SeqCst);
    }

    /// Grant the loop a full interval before the next check can miss.
    ///
    /// Called once when the pipeline starts. Restarts do not arm, so every
    /// interval without a processed frame is a miss. The miss streak is kept.
    pub fn arm(&self) {
        self.alive.store(true, Ordering::SeqCst);
    }

    /// Consume the alive flag.
    pub fn check(&self) -> HeartbeatCheck {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        *self
            .last_checked_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());

        if was_alive {
            HeartbeatCheck::Alive
        } else {
            self.total_misses.fetch_add(1, Ordering::Relaxed);
            let consecutive_misses = self.consecutive_misses.fetch_add(1, Ordering::SeqCst) + 1;
            HeartbeatCheck::Missed { consecutive_misses }
        }
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> WatchdogState {
        WatchdogState {
            alive: self.alive.load(Ordering::SeqCst),
            last_checked_at: *self
                .last_checked_at
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            consecutive_misses: self.consecutive_misses.load(Ordering::SeqCst),
            total_misses: self.total_misses.load(Ordering::Relaxed),
        }
    }
}
