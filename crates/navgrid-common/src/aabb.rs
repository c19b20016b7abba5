//! Axis-aligned bounding boxes on the navigation plane

use glam::Vec2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Aabb2 {
    /// Minimum bounds
    pub min: Vec2,
    /// Maximum bounds
    pub max: Vec2,
}

impl Aabb2 {
    /// Creates a new box from min and max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box from a center and half extents
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates an empty box (invalid bounds) that grows on the first expand
    pub fn empty() -> Self {
        Self {
            min: Vec2::splat(f32::MAX),
            max: Vec2::splat(f32::MIN),
        }
    }

    /// Smallest box containing every point, or `None` for an empty slice
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_point(*p);
        }
        Some(bounds)
    }

    /// Checks if this box is valid
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Expands this box to include another box
    pub fn expand(&mut self, other: &Aabb2) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Expands this box to include a point
    pub fn expand_point(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Checks if this box overlaps another box (touching counts)
    pub fn overlaps(&self, other: &Aabb2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Checks if the point lies inside or on the box
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Gets the center of the box
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Gets the size of the box
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Distance from the point to the box, zero when inside
    pub fn distance_to_point(&self, point: Vec2) -> f32 {
        let clamped = point.clamp(self.min, self.max);
        clamped.distance(point)
    }

    /// Splits the box into its four quadrants: SW, SE, NW, NE
    pub fn quadrants(&self) -> [Aabb2; 4] {
        let c = self.center();
        [
            Aabb2::new(self.min, c),
            Aabb2::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Aabb2::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Aabb2::new(c, self.max),
        ]
    }

    /// The four corners in counter-clockwise order starting at `min`
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}
