//! Path results and their terminal status

use glam::Vec2;

/// Terminal status of a path request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum PathStatus {
    /// Endpoints could not be resolved or the goal is unreachable
    #[default]
    NoPath,
    /// A complete path from start to end was found
    Full,
}

impl PathStatus {
    /// Checks if the status is a success
    pub fn is_success(&self) -> bool {
        *self == PathStatus::Full
    }
}

/// A planned path: polygon corridor plus waypoints
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavPath {
    pub status: PathStatus,
    /// Region the path lies in
    pub region: Option<usize>,
    /// Polygon indices from the start polygon to the goal polygon
    pub polygons: Vec<usize>,
    /// World positions from start to end
    pub waypoints: Vec<Vec2>,
}

impl NavPath {
    /// A failed path
    pub fn no_path() -> Self {
        Self::default()
    }

    pub fn is_full(&self) -> bool {
        self.status.is_success()
    }

    /// Sum of the waypoint segment lengths
    pub fn length(&self) -> f32 {
        self.waypoints.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Position `distance` along the waypoints, clamped to the ends.
    ///
    /// Zero-length segments are skipped with a warning.
    pub fn point_at_distance(&self, distance: f32) -> Option<Vec2> {
        let first = *self.waypoints.first()?;
        if distance <= 0.0 {
            return Some(first);
        }

        let mut remaining = distance;
        for (i, w) in self.waypoints.windows(2).enumerate() {
            let length = w[0].distance(w[1]);
            if length <= f32::EPSILON {
                log::warn!("Degenerate path segment {} at {:?}", i, w[0]);
                continue;
            }
            if remaining <= length {
                return Some(w[0].lerp(w[1], remaining / length));
            }
            remaining -= length;
        }

        self.waypoints.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[(f32, f32)]) -> NavPath {
        NavPath {
            status: PathStatus::Full,
            region: Some(0),
            polygons: vec![0],
            waypoints: points.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
        }
    }

    #[test]
    fn test_length() {
        let p = path(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
        assert_eq!(p.length(), 7.0);
        assert_eq!(NavPath::no_path().length(), 0.0);
        assert!(!NavPath::no_path().is_full());
    }

    #[test]
    fn test_point_at_distance() {
        let p = path(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
        assert_eq!(p.point_at_distance(-1.0), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(p.point_at_distance(1.5), Some(Vec2::new(1.5, 0.0)));
        assert_eq!(p.point_at_distance(5.0), Some(Vec2::new(3.0, 2.0)));
        assert_eq!(p.point_at_distance(100.0), Some(Vec2::new(3.0, 4.0)));
        assert_eq!(NavPath::no_path().point_at_distance(1.0), None);
    }

    #[test]
    fn test_point_at_distance_skips_degenerate_segments() {
        let p = path(&[(0.0, 0.0), (0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(p.point_at_distance(1.0), Some(Vec2::new(1.0, 0.0)));
    }
}
