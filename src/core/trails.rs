//! Bounded window of recent diff sets ("ghost trails").
//!
//! Trails serve two purposes: the presentation layer draws them as an
//! overlay, and the newest set's motion ratio is the ghost-like motion
//! trigger.

use crate::core::diff::{DiffPointSet, Point};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum points per trail drawn by the overlay.
pub const OVERLAY_POINTS_PER_TRAIL: usize = 60;

/// Trail aggregator with FIFO eviction.
#[derive(Debug)]
pub struct GhostTrails {
    trails: VecDeque<DiffPointSet>,
    max_trails: usize,
}

impl GhostTrails {
    pub fn new(max_trails: usize) -> Self {
        let max_trails = max_trails.max(1);
        Self {
            trails: VecDeque::with_capacity(max_trails),
            max_trails,
        }
    }

    /// Store a diff set. Empty sets are discarded and `false` is returned.
    pub fn record(&mut self, diff: DiffPointSet) -> bool {
        if diff.is_empty() {
            return false;
        }
        self.trails.push_back(diff);
        while self.trails.len() > self.max_trails {
            self.trails.pop_front();
        }
        true
    }

    /// Whether the newest stored set's motion ratio exceeds `threshold`.
    pub fn motion_ratio_signal(&self, threshold: f64) -> bool {
        self.latest_ratio().is_some_and(|ratio| ratio > threshold)
    }

    /// Motion ratio of the newest stored set.
    pub fn latest_ratio(&self) -> Option<f64> {
        self.trails.back().map(DiffPointSet::motion_ratio)
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Stored sets from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &DiffPointSet> {
        self.trails.iter()
    }

    pub fn clear(&mut self) {
        self.trails.clear();
    }

    /// An owned copy of the current trails for the overlay renderer.
    pub fn snapshot(&self) -> TrailSnapshot {
        TrailSnapshot {
            trails: self.trails.iter().cloned().collect(),
        }
    }
}

/// Read-only view of trails, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrailSnapshot {
    pub trails: Vec<DiffPointSet>,
}

impl TrailSnapshot {
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Each trail thinned to at most about `max_points` points, for drawing as a path.
    pub fn sampled(&self, max_points: usize) -> Vec<Vec<Point>> {
        self.trails
            .iter()
            .map(|trail| {
                let step = (trail.len() / max_points.max(1)).max(1);
                trail.points().iter().step_by(step).copied().collect()
            })
            .collect()
    }
}
