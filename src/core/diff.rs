//! Per-pixel motion diff between consecutive frames.

use crate::collector::types::Frame;
use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Coordinates whose color changed beyond the sensitivity threshold.
///
/// Points are in row-major scan order. The set remembers the frame size it
/// was computed against so its motion ratio can be derived later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffPointSet {
    points: Vec<Point>,
    frame_width: u32,
    frame_height: u32,
}

impl DiffPointSet {
    pub fn new(points: Vec<Point>, frame_width: u32, frame_height: u32) -> Self {
        Self {
            points,
            frame_width,
            frame_height,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Fraction of the frame's pixels that changed.
    pub fn motion_ratio(&self) -> f64 {
        let area = self.frame_width as f64 * self.frame_height as f64;
        if area == 0.0 {
            return 0.0;
        }
        self.points.len() as f64 / area
    }
}

/// Compare two frames and collect every pixel whose RGB delta exceeds `sensitivity`.
///
/// The delta is `|ΔR| + |ΔG| + |ΔB|`; alpha is ignored. The result does not
/// depend on argument order.
pub fn compute_diff(
    current: &Frame,
    previous: &Frame,
    sensitivity: u32,
) -> Result<DiffPointSet, DetectError> {
    if !current.same_dimensions(previous) {
        return Err(DetectError::DimensionMismatch {
            current_width: current.width(),
            current_height: current.height(),
            previous_width: previous.width(),
            previous_height: previous.height(),
        });
    }

    let width = current.width();
    let points = current
        .pixels()
        .chunks_exact(4)
        .zip(previous.pixels().chunks_exact(4))
        .enumerate()
        .filter(|(_, (a, b))| rgb_delta(a, b) > sensitivity)
        .map(|(idx, _)| Point {
            x: idx as u32 % width,
            y: idx as u32 / width,
        })
        .collect();

    Ok(DiffPointSet::new(points, width, current.height()))
}

fn rgb_delta(a: &[u8], b: &[u8]) -> u32 {
    a[..3]
        .iter()
        .zip(&b[..3])
        .map(|(&x, &y)| u32::from(x.abs_diff(y)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(width: u32, height: u32, changed: &[(u32, u32)], delta: u8) -> Frame {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[100, 100, 100, 255]);
        }
        for &(x, y) in changed {
            let i = ((y * width + x) * 4) as usize;
            pixels[i] = 100 + delta;
        }
        Frame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_identical_frames_never_diff() {
        let frame = frame_with(8, 8, &[(1, 1)], 50);
        for sensitivity in [0, 1, 30, 765] {
            assert!(compute_diff(&frame, &frame, sensitivity).unwrap().is_empty());
        }
    }

    #[test]
    fn test_diff_is_symmetric() {
        let a = frame_with(6, 4, &[(0, 0), (5, 3), (2, 1)], 40);
        let b = frame_with(6, 4, &[(2, 1), (4, 0)], 10);
        for sensitivity in [0, 5, 20, 39] {
            assert_eq!(
                compute_diff(&a, &b, sensitivity).unwrap().points(),
                compute_diff(&b, &a, sensitivity).unwrap().points()
            );
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let base = frame_with(4, 4, &[], 0);
        let moved = frame_with(4, 4, &[(3, 2)], 30);

        assert!(compute_diff(&moved, &base, 30).unwrap().is_empty());
        let diff = compute_diff(&moved, &base, 29).unwrap();
        assert_eq!(diff.points(), &[Point { x: 3, y: 2 }]);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let a = Frame::solid(2, 2, [10, 10, 10, 0]).unwrap();
        let b = Frame::solid(2, 2, [10, 10, 10, 255]).unwrap();
        assert!(compute_diff(&a, &b, 0).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Frame::solid(4, 4, [0, 0, 0, 255]).unwrap();
        let b = Frame::solid(4, 2, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            compute_diff(&a, &b, 10),
            Err(DetectError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_motion_ratio() {
        let changed: Vec<(u32, u32)> = (0..3).map(|x| (x, 0)).collect();
        let a = frame_with(10, 10, &changed, 90);
        let b = frame_with(10, 10, &[], 0);
        let diff = compute_diff(&a, &b, 60).unwrap();
        assert!((diff.motion_ratio() - 0.03).abs() < 1e-9);
    }
}
