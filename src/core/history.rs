//! Fixed-capacity history of recently captured frames.

use crate::collector::types::Frame;
use std::collections::VecDeque;
use std::sync::Arc;

/// The frames available for diffing.
#[derive(Debug, Clone, Copy)]
pub enum FramePair<'a> {
    Empty,
    Single(&'a Frame),
    Pair {
        current: &'a Frame,
        previous: &'a Frame,
    },
}

/// Ring buffer of the most recent frames, oldest evicted first.
#[derive(Debug)]
pub struct FrameHistory {
    frames: VecDeque<Arc<Frame>>,
    capacity: usize,
}

impl FrameHistory {
    /// Create an empty history holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest once over capacity.
    pub fn push(&mut self, frame: Arc<Frame>) {
        self.frames.push_back(frame);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    /// The two most recent frames, newest first.
    pub fn latest_pair(&self) -> FramePair<'_> {
        let mut newest = self.frames.iter().rev();
        match (newest.next(), newest.next()) {
            (Some(current), Some(previous)) => FramePair::Pair {
                current: current.as_ref(),
                previous: previous.as_ref(),
            },
            (Some(current), None) => FramePair::Single(current.as_ref()),
            _ => FramePair::Empty,
        }
    }

    /// The most recently pushed frame.
    pub fn latest(&self) -> Option<&Arc<Frame>> {
        self.frames.back()
    }

    /// Frames from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Frame>> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
