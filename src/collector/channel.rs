//! Push-fed sensor source.
//!
//! Platform callbacks (camera snapshot handlers, audio analyzers, motion
//! listeners) push samples through a [`SourceFeeder`]. The pipeline reads
//! them back through the paired [`ChannelSource`].

use crate::collector::SensorSource;
use crate::error::SourceError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Default queue depth between the platform callback and the pipeline.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug)]
struct SourceState {
    running: AtomicBool,
    available: AtomicBool,
    starts: AtomicU64,
    stops: AtomicU64,
    dropped: AtomicU64,
}

/// A [`SensorSource`] backed by a bounded channel.
pub struct ChannelSource<T> {
    name: &'static str,
    receiver: Receiver<T>,
    state: Arc<SourceState>,
}

/// Producer handle for a [`ChannelSource`].
pub struct SourceFeeder<T> {
    sender: Sender<T>,
    state: Arc<SourceState>,
}

impl<T> Clone for SourceFeeder<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Send> ChannelSource<T> {
    /// Create a source and its feeder with the default queue depth.
    pub fn new(name: &'static str) -> (Self, SourceFeeder<T>) {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// Create a source and its feeder with an explicit queue depth.
    pub fn with_capacity(name: &'static str, capacity: usize) -> (Self, SourceFeeder<T>) {
        let (sender, receiver) = bounded(capacity.max(1));
        let state = Arc::new(SourceState {
            running: AtomicBool::new(false),
            available: AtomicBool::new(true),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let source = Self {
            name,
            receiver,
            state: state.clone(),
        };
        let feeder = SourceFeeder { sender, state };
        (source, feeder)
    }
}

impl<T: Send> SensorSource for ChannelSource<T> {
    type Sample = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if !self.state.available.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable {
                source_name: self.name,
                reason: "device not available".to_string(),
            });
        }
        // Stale samples from a previous session are not replayed
        while self.receiver.try_recv().is_ok() {}
        self.state.running.store(true, Ordering::SeqCst);
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            self.state.stops.fetch_add(1, Ordering::SeqCst);
        }
        while self.receiver.try_recv().is_ok() {}
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    fn latest(&mut self) -> Option<T> {
        self.receiver.try_iter().last()
    }
}

impl<T> SourceFeeder<T> {
    /// Deliver a sample.
    ///
    /// Returns `false` if the sample was dropped because the source is
    /// stopped or its queue is full.
    pub fn push(&self, sample: T) -> bool {
        if !self.state.running.load(Ordering::SeqCst) {
            return false;
        }
        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.state.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Mark the underlying device as present or missing.
    ///
    /// While unavailable, `start` fails with [`SourceError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Whether the pipeline currently has this source started.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Number of successful starts.
    pub fn start_count(&self) -> u64 {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Number of stops that released a running source.
    pub fn stop_count(&self) -> u64 {
        self.state.stops.load(Ordering::SeqCst)
    }

    /// Samples dropped because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_returns_newest_sample() {
        let (mut source, feeder) = ChannelSource::<u32>::new("test");
        source.start().unwrap();

        assert!(feeder.push(1));
        assert!(feeder.push(2));
        assert!(feeder.push(3));

        assert_eq!(source.latest(), Some(3));
        assert_eq!(source.latest(), None);
    }

    #[test]
    fn test_push_dropped_while_stopped() {
        let (mut source, feeder) = ChannelSource::<u32>::new("test");
        assert!(!feeder.push(1));

        source.start().unwrap();
        source.stop();
        assert!(!feeder.push(2));
        assert_eq!(source.latest(), None);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut source, feeder) = ChannelSource::<u32>::new("test");
        source.start().unwrap();
        source.stop();
        source.stop();
        assert_eq!(feeder.start_count(), 1);
        assert_eq!(feeder.stop_count(), 1);
        assert!(!source.is_running());
    }

    #[test]
    fn test_unavailable_device_fails_start() {
        let (mut source, feeder) = ChannelSource::<u32>::new("camera");
        feeder.set_available(false);

        let err = source.start().unwrap_err();
        assert!(matches!(
            err,
            SourceError::Unavailable {
                source_name: "camera",
                ..
            }
        ));
        assert!(!source.is_running());

        feeder.set_available(true);
        assert!(source.start().is_ok());
    }

    #[test]
    fn test_full_queue_drops_samples() {
        let (mut source, feeder) = ChannelSource::<u32>::with_capacity("test", 2);
        source.start().unwrap();

        assert!(feeder.push(1));
        assert!(feeder.push(2));
        assert!(!feeder.push(3));
        assert_eq!(feeder.dropped_count(), 1);
        assert_eq!(source.latest(), Some(2));
    }
}
